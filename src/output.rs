//! Output formatting module for llmprice
//!
//! Table output for terminals and JSON output for scripts. Both formatters
//! render the same data; pick one with [`get_formatter`].

use colored::Colorize;
use llmprice_changelog::ProviderSnapshot;
use llmprice_core::types::{ChangeEvent, ChangeKind, PriceRecord};
use llmprice_pricing::{ModelCost, ModelPricingResult, PriceFields};
use prettytable::{Table, format, row};
use serde::Serialize;
use serde_json::json;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Events appended by one apply
    fn format_applied(&self, provider: &str, events: &[ChangeEvent]) -> String;

    /// A provider's (possibly filtered) change events
    fn format_history(&self, provider: &str, events: &[&ChangeEvent]) -> String;

    /// A provider's replayed prices
    fn format_snapshot(&self, snapshot: &ProviderSnapshot) -> String;

    /// Provider ids
    fn format_providers(&self, providers: &[String]) -> String;

    /// One model's published price
    fn format_pricing(&self, result: &ModelPricingResult) -> String;

    /// A provider's model ids
    fn format_models(&self, provider: &str, models: &[String]) -> String;

    /// A cost calculation
    fn format_cost(&self, cost: &ModelCost) -> String;
}

/// Table formatter for human-readable output
pub struct TableFormatter;

impl TableFormatter {
    /// Format a number with thousands separators
    fn format_number(n: u64) -> String {
        let s = n.to_string();
        let mut result = String::new();

        for (count, ch) in s.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                result.push(',');
            }
            result.push(ch);
        }

        result.chars().rev().collect()
    }

    /// Format a per-million-token rate
    fn format_rate(rate: Option<f64>) -> String {
        match rate {
            Some(rate) => format!("${rate:.4}"),
            None => "-".to_string(),
        }
    }

    /// Format a cost; small amounts keep enough digits to be non-zero
    fn format_currency(amount: f64) -> String {
        if amount != 0.0 && amount.abs() < 0.01 {
            format!("${amount:.6}")
        } else {
            format!("${amount:.2}")
        }
    }

    fn format_tokens(tokens: Option<u64>) -> String {
        tokens.map(Self::format_number).unwrap_or_else(|| "-".to_string())
    }

    fn format_kind(kind: ChangeKind) -> String {
        match kind {
            ChangeKind::Added => kind.to_string().green().to_string(),
            ChangeKind::Updated => kind.to_string().yellow().to_string(),
            ChangeKind::Removed => kind.to_string().red().to_string(),
        }
    }

    fn format_status(stale: bool) -> String {
        if stale {
            "stale".yellow().to_string()
        } else {
            "current".green().to_string()
        }
    }

    /// "old → new" when a rate moved, else the rate alone
    fn format_change(new: f64, old: Option<f64>) -> String {
        match old {
            Some(old) if old != new => format!("${old:.4} → ${new:.4}"),
            _ => format!("${new:.4}"),
        }
    }

    fn event_table(events: &[&ChangeEvent]) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![
            b -> "Date",
            b -> "Change",
            b -> "Model",
            b -> "Input $/M",
            b -> "Output $/M",
            b -> "Cached $/M"
        ]);

        for event in events {
            let model = event.model();
            let previous = event.previous();
            let cached = match (model.cached, previous.and_then(|p| p.cached)) {
                (Some(new), old) => Self::format_change(new, old),
                (None, _) => "-".to_string(),
            };
            table.add_row(row![
                event.date.format("%Y-%m-%d"),
                Self::format_kind(event.kind()),
                model.model_id,
                r -> Self::format_change(model.input, previous.map(|p| p.input)),
                r -> Self::format_change(model.output, previous.map(|p| p.output)),
                r -> cached
            ]);
        }

        table
    }

    fn record_row(record: &PriceRecord) -> prettytable::Row {
        row![
            record.model_id,
            record.name,
            r -> Self::format_rate(Some(record.input)),
            r -> Self::format_rate(Some(record.output)),
            r -> Self::format_rate(record.cached),
            r -> Self::format_tokens(record.context_window),
            r -> Self::format_tokens(record.max_output_tokens)
        ]
    }
}

impl OutputFormatter for TableFormatter {
    fn format_applied(&self, provider: &str, events: &[ChangeEvent]) -> String {
        if events.is_empty() {
            return format!("No price changes for {provider}\n");
        }
        let refs: Vec<&ChangeEvent> = events.iter().collect();
        format!(
            "{}\n{} change(s) recorded for {}\n",
            Self::event_table(&refs),
            events.len(),
            provider
        )
    }

    fn format_history(&self, provider: &str, events: &[&ChangeEvent]) -> String {
        if events.is_empty() {
            return format!("No recorded changes for {provider}\n");
        }
        Self::event_table(events).to_string()
    }

    fn format_snapshot(&self, snapshot: &ProviderSnapshot) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![
            b -> "Model",
            b -> "Name",
            b -> "Input $/M",
            b -> "Output $/M",
            b -> "Cached $/M",
            b -> "Context",
            b -> "Max Output"
        ]);
        for record in &snapshot.models {
            table.add_row(Self::record_row(record));
        }

        format!(
            "{} prices as of {} ({} models)\n{}",
            snapshot.provider.bold(),
            snapshot.date,
            snapshot.models.len(),
            table
        )
    }

    fn format_providers(&self, providers: &[String]) -> String {
        let mut output = String::new();
        for provider in providers {
            output.push_str(provider);
            output.push('\n');
        }
        output
    }

    fn format_pricing(&self, result: &ModelPricingResult) -> String {
        let pricing: &PriceFields = &result.pricing;
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);

        table.add_row(row![b -> "Provider", result.provider]);
        table.add_row(row![b -> "Model", result.model]);
        table.add_row(row![b -> "Input $/M", r -> Self::format_rate(pricing.input)]);
        table.add_row(row![b -> "Output $/M", r -> Self::format_rate(pricing.output)]);
        table.add_row(row![b -> "Cached $/M", r -> Self::format_rate(pricing.cached)]);
        table.add_row(row![b -> "Context", r -> Self::format_tokens(pricing.context)]);
        table.add_row(row![b -> "Max Output", r -> Self::format_tokens(pricing.max_output)]);
        for (label, variant) in [
            ("Image", &pricing.image),
            ("Audio", &pricing.audio),
            ("Video", &pricing.video),
        ] {
            if let Some(value) = variant {
                table.add_row(row![b -> label, value.to_string()]);
            }
        }
        table.add_row(row![b -> "Data Date", result.date.format("%Y-%m-%d")]);
        table.add_row(row![b -> "Status", Self::format_status(result.stale)]);

        table.to_string()
    }

    fn format_models(&self, provider: &str, models: &[String]) -> String {
        let mut output = format!("{} ({} models)\n", provider.bold(), models.len());
        for model in models {
            output.push_str("  ");
            output.push_str(model);
            output.push('\n');
        }
        output
    }

    fn format_cost(&self, cost: &ModelCost) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);

        table.add_row(row![b -> "Model", format!("{}/{}", cost.provider, cost.model)]);
        table.add_row(row![b -> "Input", r -> Self::format_currency(cost.cost.input_cost)]);
        table.add_row(row![b -> "Output", r -> Self::format_currency(cost.cost.output_cost)]);
        table.add_row(row![b -> "Total", r -> Self::format_currency(cost.cost.total_cost).bold()]);
        if cost.cost.used_cached_pricing {
            table.add_row(row![b -> "Cached Pricing", "yes"]);
        }
        table.add_row(row![b -> "Data Date", cost.date.format("%Y-%m-%d")]);
        table.add_row(row![b -> "Status", Self::format_status(cost.stale)]);

        table.to_string()
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    fn render<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_applied(&self, provider: &str, events: &[ChangeEvent]) -> String {
        Self::render(&json!({ "provider": provider, "changes": events }))
    }

    fn format_history(&self, provider: &str, events: &[&ChangeEvent]) -> String {
        Self::render(&json!({ "provider": provider, "changes": events }))
    }

    fn format_snapshot(&self, snapshot: &ProviderSnapshot) -> String {
        Self::render(snapshot)
    }

    fn format_providers(&self, providers: &[String]) -> String {
        Self::render(&json!({ "providers": providers }))
    }

    fn format_pricing(&self, result: &ModelPricingResult) -> String {
        Self::render(result)
    }

    fn format_models(&self, provider: &str, models: &[String]) -> String {
        Self::render(&json!({ "provider": provider, "models": models }))
    }

    fn format_cost(&self, cost: &ModelCost) -> String {
        Self::render(cost)
    }
}

/// Render any serializable value as pretty JSON
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    JsonFormatter::render(value)
}

/// Create an output formatter based on the output format
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}
