//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::open_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    match store.list_forms().await {
        Ok(forms) => {
            if forms.is_empty() {
                Output::info("No forms stored yet. Use 'formrag ingest <file.json>' to add one.");
            } else {
                Output::header(&format!("Forms ({})", forms.len()));
                println!();

                for form in &forms {
                    Output::form_info(&form.name, &form.id.to_string(), form.response_count);
                }

                let total: usize = forms.iter().map(|f| f.response_count).sum();
                println!();
                Output::kv("Total forms", &forms.len().to_string());
                Output::kv("Total responses", &total.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list forms: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
