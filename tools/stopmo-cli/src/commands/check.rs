//! Check encoder availability.

use stopmo_common::config::AppConfig;
use stopmo_render_engine::encoder::{encoder_for, ClipFormat};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Stopmo System Check");
    println!("{}", "=".repeat(50));

    let mut default_ok = false;
    let default_format = config.export.format.parse::<ClipFormat>().ok();
    for format in [ClipFormat::Gif, ClipFormat::Webm, ClipFormat::Mp4, ClipFormat::Raw] {
        let encoder = encoder_for(format);
        let available = encoder.is_available();
        if Some(format) == default_format {
            default_ok = available;
        }
        if available {
            println!("[OK]   {:<5} via {}", format.to_string(), encoder.name());
        } else {
            println!("[WARN] {:<5} needs {} on PATH", format.to_string(), encoder.name());
        }
    }

    println!();
    println!(
        "Surface: {}x{}",
        config.surface.width, config.surface.height
    );
    println!("Exports: {}", config.exports_dir.display());

    println!();
    match default_format {
        Some(format) if default_ok => println!("Default format '{format}' is ready."),
        Some(format) => println!("Default format '{format}' is unavailable. See above for fixes."),
        None => println!(
            "Configured format '{}' is not recognised. Use: gif, webm, mp4, raw",
            config.export.format
        ),
    }

    Ok(())
}
