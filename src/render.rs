use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::RenderArgs;
use crate::favorites::Favorites;
use crate::fetch::HttpLoader;
use crate::record::Record;

/// How a fragment is meant to land in the container: `Replace` swaps the
/// whole content (and owns the empty state), `Append` adds after existing
/// cards and brings its own fresh sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Replace,
    Append,
}

/// Projects a record sequence into an HTML fragment. Pure string building:
/// class and data-attribute names are the contract external styling and the
/// browse script hook into. `sentinel` is `None` for filtered and search
/// views, which render unpaginated.
pub fn render_batch<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    favorites: &Favorites,
    mode: RenderMode,
    sentinel: Option<&str>,
) -> String {
    let cards: Vec<String> = records
        .into_iter()
        .map(|record| card(record, favorites))
        .collect();

    if cards.is_empty() && mode == RenderMode::Replace {
        return empty_state();
    }

    let mut html = cards.join("\n");
    if let Some(token) = sentinel {
        html.push('\n');
        html.push_str(&sentinel_element(token));
    }
    html
}

pub fn empty_state() -> String {
    concat!(
        r#"<div class="empty-state">"#,
        "<h3>Nothing here yet</h3>",
        "<p>Try adjusting your search or filter criteria.</p>",
        "</div>"
    )
    .to_owned()
}

fn sentinel_element(token: &str) -> String {
    format!(r#"<div class="load-sentinel" data-sentinel="{}"></div>"#, escape(token))
}

fn card(record: &Record, favorites: &Favorites) -> String {
    // A record that normalized to nothing presentable degrades to the
    // empty-state body instead of an unlabeled husk.
    if record.is_blank() {
        return empty_state();
    }

    let id = record.id();
    let mut html = String::new();
    match &id {
        Some(id) => {
            html.push_str(&format!(
                r#"<div class="catalog-card" data-record-id="{}">"#,
                escape(id)
            ));
            let active = if favorites.contains(id) { " active" } else { "" };
            html.push_str(&format!(
                r#"<button class="favorite-toggle{active}" data-record-id="{}" aria-label="Favorite">&#9733;</button>"#,
                escape(id)
            ));
        }
        // No derivable identifier: still rendered, but not favoritable.
        None => html.push_str(r#"<div class="catalog-card">"#),
    }

    html.push_str(&format!("<h3>{}</h3>", escape(record.display_title())));
    if let Some(description) = &record.description {
        html.push_str(&format!("<p>{}</p>", escape(description)));
    }

    let mut badges = Vec::new();
    for category in &record.categories {
        badges.push(badge("category", category));
    }
    if let Some(language) = &record.language {
        badges.push(badge("language", language));
    }
    if let Some(license) = &record.license {
        badges.push(badge("license", license));
    }
    if let Some(metric) = &record.metric {
        badges.push(badge("metric", metric));
    }
    if let Some(auth) = &record.auth {
        badges.push(badge("auth", auth));
    }
    for tag in &record.tags {
        badges.push(badge("tag", tag));
    }
    if !badges.is_empty() {
        html.push_str(&format!(
            r#"<div class="card-meta">{}</div>"#,
            badges.join("")
        ));
    }

    if let Some(link) = &record.link {
        html.push_str(&format!(
            r#"<a class="card-link" href="{}" target="_blank" rel="noopener noreferrer">Visit</a>"#,
            escape(link)
        ));
    }

    html.push_str("</div>");
    html
}

fn badge(kind: &str, value: &str) -> String {
    format!(r#"<span class="meta-badge {kind}">{}</span>"#, escape(value))
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Full standalone browse page. Each section is a labeled container whose
/// initial content the caller already rendered; the inline script drives
/// sentinel observation and favorite toggles against the serve endpoints
/// (both are inert on a static export).
pub fn render_page(title: &str, sections: &[(String, String, String)]) -> String {
    let mut body = String::new();
    for (key, label, fragment) in sections {
        body.push_str(&format!(
            concat!(
                r#"<section class="catalog-section" data-source="{key}">"#,
                "<h2>{label}</h2>",
                r#"<div class="catalog-container" id="catalog-{key}">{fragment}</div>"#,
                "</section>\n"
            ),
            key = escape(key),
            label = escape(label),
            fragment = fragment,
        ));
    }

    format!(
        concat!(
            "<!doctype html>\n<html>\n<head>\n",
            r#"<meta charset="utf-8">"#,
            "\n<title>{title}</title>\n",
            "</head>\n<body>\n",
            "<h1>{title}</h1>\n",
            r#"<input type="search" id="catalog-search" placeholder="Search all sources">"#,
            "\n{body}",
            "<script>\n{script}</script>\n",
            "</body>\n</html>\n"
        ),
        title = escape(title),
        body = body,
        script = BROWSE_SCRIPT,
    )
}

// The one-shot-per-sentinel rule lives server-side; the client just reports
// visibility and swaps fragments. 200px lookahead so the next batch starts
// before the user reaches the literal bottom.
const BROWSE_SCRIPT: &str = r#"
function observeSentinels(container, source) {
  container.querySelectorAll('.load-sentinel').forEach((sentinel) => {
    const observer = new IntersectionObserver((entries) => {
      if (!entries.some((entry) => entry.isIntersecting)) return;
      observer.disconnect();
      const token = sentinel.dataset.sentinel;
      fetch(`/catalog/${source}/more`, {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ sentinel: token }),
      }).then((response) => (response.status === 200 ? response.text() : null))
        .then((fragment) => {
          if (fragment === null) { sentinel.remove(); return; }
          const wrapper = document.createElement('div');
          wrapper.innerHTML = fragment;
          sentinel.remove();
          while (wrapper.firstChild) container.appendChild(wrapper.firstChild);
          observeSentinels(container, source);
          wireFavorites(container);
        });
    }, { rootMargin: '200px' });
    observer.observe(sentinel);
  });
}

function wireFavorites(scope) {
  scope.querySelectorAll('.favorite-toggle').forEach((button) => {
    if (button.dataset.wired) return;
    button.dataset.wired = '1';
    button.addEventListener('click', () => {
      fetch(`/favorites/${encodeURIComponent(button.dataset.recordId)}/toggle`, { method: 'POST' })
        .then((response) => response.json())
        .then((state) => button.classList.toggle('active', state.favorite));
    });
  });
}

document.querySelectorAll('.catalog-section').forEach((section) => {
  const source = section.dataset.source;
  const container = section.querySelector('.catalog-container');
  observeSentinels(container, source);
  wireFavorites(container);
});

const search = document.getElementById('catalog-search');
if (search) {
  search.addEventListener('input', () => {
    const query = search.value.trim();
    if (!query) { window.location.reload(); return; }
    fetch(`/search?q=${encodeURIComponent(query)}`)
      .then((response) => response.text())
      .then((fragment) => {
        const first = document.querySelector('.catalog-container');
        if (first) { first.innerHTML = fragment; wireFavorites(first); }
      });
  });
}
"#;

/// `render` command: fetch everything and write a static browse page. The
/// static export renders each source in full, so no sentinels are emitted.
pub async fn run(args: RenderArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    if out_path.exists() {
        anyhow::bail!("render output already exists: {}", out_path.display());
    }

    let (config, base_dir) = crate::config::load(PathBuf::from(&args.config).as_path())?;
    let loader = Arc::new(HttpLoader::new(base_dir)?);
    let catalog = crate::fetch::load_all(loader, &config.sources).await;
    let favorites = match &args.favorites {
        Some(path) => Favorites::load(PathBuf::from(path).as_path()),
        None => Favorites::in_memory(),
    };

    let sections: Vec<(String, String, String)> = config
        .sources
        .iter()
        .map(|descriptor| {
            let fragment = render_batch(
                catalog.records(&descriptor.key),
                &favorites,
                RenderMode::Replace,
                None,
            );
            (descriptor.key.clone(), descriptor.label.clone(), fragment)
        })
        .collect();

    let page = render_page(config.title(), &sections);
    std::fs::write(&out_path, page)
        .with_context(|| format!("write browse page: {}", out_path.display()))?;
    tracing::info!(out = %out_path.display(), records = catalog.len(), "rendered browse page");
    Ok(())
}
