use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::ListArgs;
use crate::favorites::Favorites;
use crate::fetch::HttpLoader;
use crate::filter::FilterState;
use crate::paginate::Paginator;
use crate::record::Record;

pub async fn run(args: ListArgs) -> anyhow::Result<()> {
    let (config, base_dir) = crate::config::load(PathBuf::from(&args.config).as_path())?;
    if let Some(source) = &args.source {
        if config.source(source).is_none() {
            anyhow::bail!("unknown source key: {source}");
        }
    }

    let loader = Arc::new(HttpLoader::new(base_dir)?);
    let catalog = crate::fetch::load_all(loader, &config.sources).await;
    let favorites = match &args.favorites {
        Some(path) => Favorites::load(PathBuf::from(path).as_path()),
        None => Favorites::in_memory(),
    };

    let filter = FilterState {
        category: args.category,
        language: args.language,
        license: args.license,
        query: args.query,
        favorites_only: args.favorites_only,
        sort: args.sort,
    };

    let selected: Vec<&str> = match &args.source {
        Some(source) => vec![source.as_str()],
        None => catalog.source_keys().iter().map(String::as_str).collect(),
    };

    for key in selected {
        let label = config
            .source(key)
            .map(|descriptor| descriptor.label.as_str())
            .unwrap_or(key);

        if filter.is_active() {
            // Filtered views ignore pagination and print in one pass.
            let matched = crate::filter::apply(catalog.records(key), &filter, &favorites);
            println!("== {label} ({}) ==", matched.len());
            for record in matched {
                print_record(record, &favorites);
            }
            continue;
        }

        println!("== {label} ({}) ==", catalog.records(key).len());
        if args.batches {
            let mut paginator = Paginator::new();
            let mut batch_index = 0;
            loop {
                let batch = paginator.next_batch(&catalog, key, config.batch_size);
                if batch.is_empty() {
                    break;
                }
                batch_index += 1;
                println!("-- batch {batch_index} --");
                for record in batch {
                    print_record(record, &favorites);
                }
            }
        } else {
            for record in catalog.records(key) {
                print_record(record, &favorites);
            }
        }
    }

    Ok(())
}

fn print_record(record: &Record, favorites: &Favorites) {
    let star = record
        .id()
        .filter(|id| favorites.contains(id))
        .map(|_| "* ")
        .unwrap_or("");
    let categories = if record.categories.is_empty() {
        String::new()
    } else {
        format!("  [{}]", record.categories.join(", "))
    };
    println!("{star}{}{categories}", record.display_title());
}
