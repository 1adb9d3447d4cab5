use anyhow::Result;
use chrono::Local;
use clap::Parser;
use console::style;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use web_image_export::cli::Args;
use web_image_export::export::encode::avif_available;
use web_image_export::utils::{
    create_progress_bar, error_println, format_duration, format_size, timestamp_dir_name,
    validate_inputs, verbose_println, warn_println,
};
use web_image_export::{ExportConfig, ExportEngine, ExportResult, JsonMessage, OutputGroup};

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let mut args = Args::parse();
    args.load_and_merge_config()?;
    let json_mode = args.json_progress;

    if !json_mode {
        println!("{}", style("Web Image Export").bold().blue());
        println!("{}", style("PNG, JPEG, WebP, AVIF and SVG for the web").dim());
        println!();
    }

    validate_inputs(&args)?;

    let config = ExportConfig {
        output_root: args.output_root(),
        timestamp: args
            .use_timestamp()
            .then(|| timestamp_dir_name(Local::now())),
        favicon: args.favicon,
        website: args.website,
        public: args.public,
        write_archives: args.write_archives(),
        extensions: args.parse_extensions(),
        // Verbose lines would interleave with the JSON stream
        verbose: args.verbose && !json_mode,
    };

    if config.verbose {
        println!("{}", style("Configuration:").bold());
        println!("  Output directory: {}", config.output_dir().display());
        println!("  Favicons: {}", enabled(config.favicon));
        println!("  Website variants: {}", enabled(config.website));
        println!("  Public layout: {}", enabled(config.public));
        println!("  ZIP archives: {}", enabled(config.write_archives));
        println!("  AVIF: {}", if avif_available() { "available" } else { "not compiled in" });
        println!("  Extensions: {:?}", config.extensions);
        println!();
    }

    let mut engine = ExportEngine::new(config);
    let image_files = engine.discover_images(&args.sources)?;

    if image_files.is_empty() {
        if json_mode {
            JsonMessage::warning("No images found with specified extensions").emit();
            JsonMessage::summary(0, 0, 0, engine.output_dir(), start_time.elapsed().as_secs_f64())
                .emit();
        } else {
            println!("{}", style("No images found with specified extensions").red());
        }
        return Ok(ExitCode::SUCCESS);
    }

    engine.prepare_output_dir()?;
    verbose_println(
        engine.config().verbose,
        &format!("Writing into {}", engine.output_dir().display()),
    );

    if !avif_available() {
        let message = "AVIF encoder not available in this build, .avif outputs will be skipped";
        if json_mode {
            JsonMessage::warning(message).emit();
        } else {
            warn_println(message);
        }
    }

    let total = image_files.len();
    let progress = if json_mode {
        None
    } else {
        let pb = create_progress_bar(total as u64)?;
        pb.set_message("Converting images");
        engine.set_progress_bar(pb.clone());
        Some(pb)
    };

    let results = engine.process_batch(&image_files, |index, path, result| {
        let name = display_name(path);
        match &progress {
            Some(pb) => {
                if let Err(e) = result {
                    pb.suspend(|| error_println(&format!("{}: {:#}", path.display(), e)));
                }
                pb.set_message(name);
                pb.inc(1);
            }
            None => {
                JsonMessage::progress(index, total, name);
                match result {
                    Ok(export) => JsonMessage::file_completed(export).emit(),
                    Err(e) => JsonMessage::file_failed(path, e).emit(),
                }
            }
        }
    });

    if let Some(pb) = &progress {
        pb.finish_with_message("✓ Conversion complete!");
        println!();
    }

    let successful = results.iter().filter(|r| r.is_ok()).count();
    let failed = results.len() - successful;
    let total_time = start_time.elapsed();

    if json_mode {
        JsonMessage::summary(
            total,
            successful,
            failed,
            engine.output_dir(),
            total_time.as_secs_f64(),
        )
        .emit();
    } else {
        print_summary(&image_files, &results, engine.output_dir(), total_time);
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn print_summary(
    image_files: &[std::path::PathBuf],
    results: &[Result<ExportResult>],
    output_dir: &Path,
    total_time: std::time::Duration,
) {
    let successful = results.iter().filter(|r| r.is_ok()).count();
    let failed = results.len() - successful;

    println!("{}", style("Results Summary:").bold().green());
    println!("  Successfully converted: {}", style(successful).bold().green());
    if failed > 0 {
        println!("  Failed: {}", style(failed).bold().red());
    }

    if successful > 0 {
        println!();
        println!("{}", style("Detailed Results:").bold().blue());
        for (i, result) in results.iter().enumerate() {
            let Ok(export) = result else { continue };

            let favicons = export
                .outputs
                .iter()
                .filter(|o| o.group == OutputGroup::Favicon)
                .count();
            let web = export
                .outputs
                .iter()
                .filter(|o| o.group == OutputGroup::Web)
                .count();

            let mut extras = Vec::new();
            if favicons > 0 {
                extras.push(format!("{} favicon files", favicons));
            }
            if web > 0 {
                extras.push(format!("{} web files", web));
            }
            if export.archive_path().is_some() {
                extras.push("zip".to_string());
            }

            println!(
                "  {}: {} {}x{} → {} files, {} {}",
                style(format!("#{}", i + 1)).dim(),
                style(display_name(&export.input_path)).bold(),
                export.width,
                export.height,
                style(export.outputs.len()).cyan(),
                style(format_size(export.total_bytes())).cyan(),
                style(if extras.is_empty() {
                    String::new()
                } else {
                    format!("({})", extras.join(", "))
                })
                .dim()
            );

            for skipped in &export.skipped {
                println!(
                    "      {} {}: {}",
                    style("skipped").yellow(),
                    skipped.name,
                    style(skipped.reason).dim()
                );
            }
        }
    }

    if failed > 0 {
        println!();
        println!("{}", style("Failed Files:").bold().red());
        for (path, result) in image_files.iter().zip(results) {
            if let Err(e) = result {
                println!("  {}: {:#}", style(path.display()).bold(), e);
            }
        }
    }

    println!();
    println!("  Output directory: {}", style(output_dir.display()).bold());
    println!("  Total time: {}", style(format_duration(total_time)).bold());
}
