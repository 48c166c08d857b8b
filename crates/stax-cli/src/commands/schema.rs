//! `stax schema`: the JSON schema of `stax.config.json`.

use crate::cli::SchemaArgs;
use crate::config::StaxConfig;
use crate::error::{Result, ResultExt};
use crate::ui;

pub fn schema_json() -> Result<String> {
    let schema = schemars::schema_for!(StaxConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

pub fn execute(args: SchemaArgs) -> Result<()> {
    let json = schema_json()?;
    match args.output {
        Some(path) => {
            std::fs::File::create(&path)
                .and_then(|mut file| std::io::Write::write_all(&mut file, json.as_bytes()))
                .with_path(&path)?;
            ui::success(&format!("Schema written to {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}
