//! `kbchat config` — Configuration inspection commands.

use kbchat_config::{LayerStatus, Settings};

use super::GlobalOpts;

pub fn show(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::resolve_config(opts).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("# environment: {}", config.environment());
    for report in config.layers() {
        println!("# layer {:<20} {:<10} {}", report.name, describe(&report.status), report.origin);
    }
    println!();

    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");
    Ok(())
}

pub fn validate(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match super::resolve_config(opts) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };

    let mut warnings = Vec::new();
    for report in config.layers() {
        if let LayerStatus::Failed { reason } = &report.status {
            warnings.push(format!("Layer '{}' failed to load: {reason}", report.name));
        }
    }

    match Settings::from_config(&config) {
        Ok(settings) => {
            println!("   Settings extracted successfully");

            if settings.base_credentials().is_none() {
                warnings.push(
                    "No base credentials (set AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY)".to_string(),
                );
            }
            if !settings.templates_dir.is_dir() {
                warnings.push(format!(
                    "Templates directory not found: {}",
                    settings.templates_dir.display()
                ));
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   Warning: {w}");
                }
            }

            println!();
            println!("   Environment:     {}", settings.environment);
            println!("   Region:          {}", settings.region);
            println!("   Role:            {}", settings.role_arn);
            println!("   Knowledge base:  {}", settings.knowledge_base_id);
            println!("   Model:           {}", settings.model_id);
            println!("   Templates:       {}", settings.templates_dir.display());
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

fn describe(status: &LayerStatus) -> String {
    match status {
        LayerStatus::Loaded { keys } => format!("loaded({keys})"),
        LayerStatus::Missing => "missing".into(),
        LayerStatus::Failed { .. } => "failed".into(),
    }
}
