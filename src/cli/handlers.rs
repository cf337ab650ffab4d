use crate::{transform_file_with_result, CssError, Result, TransformRequest, TransformStats};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;

// --- TRANSFORM ---
pub fn handle_transform_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = matches.get_one::<String>("input").unwrap();
    let output_path = match matches.get_one::<String>("output") {
        Some(path) => path.to_string(),
        None => default_output_path(input_path, cli.output_directory(), matches.get_flag("minify")),
    };

    let request = cli.build_request(matches)?;

    if matches.get_flag("watch") {
        watch_and_transform(input_path, &output_path, request)
    } else {
        transform_single_file(input_path, &output_path, &request, matches)
    }
}

/// `app.css` becomes `app.out.css` (or `app.min.css`), optionally inside
/// the configured output directory.
fn default_output_path(input_path: &str, output_directory: Option<&str>, minify: bool) -> String {
    let input = Path::new(input_path);
    let extension = if minify { "min.css" } else { "out.css" };
    let file_name = input.with_extension(extension);
    match (output_directory, file_name.file_name()) {
        (Some(dir), Some(name)) => Path::new(dir).join(name).to_string_lossy().into_owned(),
        _ => file_name.to_string_lossy().into_owned(),
    }
}

#[derive(Serialize)]
struct ModuleManifest<'a> {
    exports: &'a [crate::CssModuleExport],
    references: &'a [crate::CssModulePlaceholder],
    dependencies: &'a [crate::Dependency],
}

fn transform_single_file(
    input_path: &str,
    output_path: &str,
    request: &TransformRequest,
    matches: &clap::ArgMatches,
) -> Result<()> {
    println!("🎨 Transforming {} -> {}", input_path, output_path);

    let (result, stats) = transform_file_with_result(input_path, output_path, request)?;

    println!("✅ Transformation successful!");
    println!("   Output: {} bytes", stats.output_size);
    println!("   Time: {}ms", stats.transform_time_ms);
    if stats.source_size > 0 {
        println!("   Compression: {:.1}%", (1.0 - stats.compression_ratio) * 100.0);
    }
    if result.map.is_some() {
        println!("   Source map: {}.map", output_path);
    }

    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }

    if let Some(exports_path) = matches.get_one::<String>("exports") {
        let manifest = ModuleManifest {
            exports: &result.exports,
            references: &result.references,
            dependencies: &result.dependencies,
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| CssError::InvalidFormat {
            message: format!("Failed to serialize exports: {}", e),
        })?;
        fs::write(exports_path, json)?;
        println!("   Exports: {}", exports_path);
    }

    if matches.get_flag("stats") {
        print_detailed_stats(&stats);
    }

    Ok(())
}

fn watch_and_transform(input_path: &str, output_path: &str, request: TransformRequest) -> Result<()> {
    println!("👀 Watching {} for changes...", input_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| {
        CssError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to create file watcher: {}", e),
        ))
    })?;

    watcher
        .watch(Path::new(input_path), RecursiveMode::NonRecursive)
        .map_err(|e| {
            CssError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to watch file: {}", e),
            ))
        })?;

    match transform_file_with_result(input_path, output_path, &request) {
        Ok(_) => println!("✅ Initial transformation successful"),
        Err(e) => eprintln!("❌ Initial transformation failed: {}", e),
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    continue;
                }
                println!("🔄 File changed, transforming...");
                match transform_file_with_result(input_path, output_path, &request) {
                    Ok((result, stats)) => {
                        println!(
                            "✅ Transformed successfully ({} bytes, {}ms)",
                            stats.output_size, stats.transform_time_ms
                        );
                        for warning in &result.warnings {
                            println!("   ⚠️  {}", warning);
                        }
                    }
                    Err(e) => eprintln!("❌ Transformation failed: {}", e),
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

// --- TARGETS ---
pub fn handle_targets_command(matches: &clap::ArgMatches) -> Result<()> {
    let query = matches.get_one::<String>("query").unwrap();
    let targets = crate::browserslist_to_targets(query)?;

    if matches.get_flag("json") {
        let json = serde_json::to_string_pretty(&targets).map_err(|e| CssError::InvalidFormat {
            message: format!("Failed to serialize targets: {}", e),
        })?;
        println!("{}", json);
        return Ok(());
    }

    if targets.is_empty() {
        println!("🌐 {} matched no browsers", query);
        return Ok(());
    }

    println!("🌐 Targets for \"{}\":", query);
    for (browser, version) in targets.iter() {
        println!("   {:<10} {}", browser.name(), version);
    }
    Ok(())
}

// --- CHECK ---
pub fn handle_check_command(matches: &clap::ArgMatches) -> Result<()> {
    let input_path = matches.get_one::<String>("input").unwrap();
    let recursive = matches.get_flag("recursive");

    if Path::new(input_path).is_dir() {
        check_directory(input_path, recursive)
    } else {
        check_single_file(input_path)
    }
}

/// Parse with every syntax extension enabled and no recovery.
fn check_source(path: &Path) -> Result<()> {
    let code = fs::read(path).map_err(|e| CssError::FileNotFound {
        path: format!("{}: {}", path.display(), e),
    })?;
    let options = crate::ParserOptions {
        filename: path.to_string_lossy().into_owned(),
        nesting: true,
        custom_media: true,
        ..crate::ParserOptions::default()
    };
    crate::parse(&code, &options).map(|_| ())
}

fn check_single_file(input_path: &str) -> Result<()> {
    println!("🔍 Checking {}", input_path);
    match check_source(Path::new(input_path)) {
        Ok(()) => {
            println!("✅ {} - No issues found", input_path);
            Ok(())
        }
        Err(e) => {
            println!("❌ {} - {}", input_path, e);
            Err(e)
        }
    }
}

fn check_directory(dir_path: &str, recursive: bool) -> Result<()> {
    let mut total_files = 0;
    let mut error_files = 0;

    let walker = walkdir::WalkDir::new(dir_path).max_depth(if recursive { usize::MAX } else { 1 });
    for entry in walker {
        let entry = entry.map_err(|e| {
            CssError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "css") {
            continue;
        }

        total_files += 1;
        match check_source(path) {
            Ok(()) => println!("✅ {}", path.display()),
            Err(e) => {
                error_files += 1;
                println!("❌ {} - {}", path.display(), e);
            }
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", total_files);
    println!("   Files with errors: {}", error_files);
    if total_files > 0 {
        println!(
            "   Success rate: {:.1}%",
            (total_files - error_files) as f64 / total_files as f64 * 100.0
        );
    }

    if error_files > 0 {
        return Err(CssError::InvalidFormat {
            message: format!("{} of {} files have errors", error_files, total_files),
        });
    }
    Ok(())
}

// --- HELPERS ---
fn print_detailed_stats(stats: &TransformStats) {
    println!("\n📊 Detailed Transformation Statistics:");
    println!("   Source size: {} bytes", stats.source_size);
    println!("   Output size: {} bytes", stats.output_size);
    println!("   Compression ratio: {:.1}%", (1.0 - stats.compression_ratio) * 100.0);
    println!("   Transform time: {}ms", stats.transform_time_ms);
    println!("\n   Output breakdown:");
    println!("     Rules: {}", stats.rule_count);
    println!("     Exports: {}", stats.export_count);
    println!("     Dependencies: {}", stats.dependency_count);
    println!("     Warnings: {}", stats.warning_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("styles/app.css", None, false), "styles/app.out.css");
        assert_eq!(default_output_path("app.css", None, true), "app.min.css");
        assert_eq!(default_output_path("styles/app.css", Some("dist"), true), "dist/app.min.css");
    }

    #[test]
    fn test_check_directory_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.css"), ".a { color: red }").unwrap();
        fs::write(dir.path().join("notes.txt"), "not css {").unwrap();
        let dir_path = dir.path().to_str().unwrap();
        assert!(check_directory(dir_path, false).is_ok());

        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("bad.css"), ".a { color red }").unwrap();
        assert!(check_directory(dir_path, false).is_ok());
        assert!(check_directory(dir_path, true).is_err());
    }
}
