//! Terminal rendering for domain-price.
//!
//! Spinner animation and progress text go to stderr; results go to stdout so
//! they can be piped. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use domain_price_lib::{AggregateResult, LookupError, Price, ProgressEvent, Quote, SweepResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner on stderr whose message can be updated while
/// it runs.
pub struct Spinner {
    running: Arc<AtomicBool>,
    message: Arc<Mutex<String>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a new spinner with the given message (e.g. "Checking example.com...").
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let message = Arc::new(Mutex::new(message));
        let running_clone = running.clone();
        let message_clone = message.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let text = message_clone
                    .lock()
                    .map(|m| m.clone())
                    .unwrap_or_default();
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), text));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            message,
            handle: Some(handle),
        }
    }

    pub fn set_message(&self, text: String) {
        if let Ok(mut message) = self.message.lock() {
            *message = text;
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

/// Spinner text for a progress milestone.
pub fn progress_message(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RegistrarDone {
            domain,
            registrar,
            ok,
        } => format!(
            "{} answered for {}{}",
            registrar,
            domain,
            if *ok { "" } else { " (failed)" }
        ),
        ProgressEvent::DomainDone {
            domain,
            completed,
            total,
        } => format!("[{}/{}] {} checked", completed, total, domain),
    }
}

// ── Prices ───────────────────────────────────────────────────────────────────

pub fn currency_symbol(code: &str) -> String {
    match code {
        "EUR" => "€".to_string(),
        "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{} ", other),
    }
}

pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{}{:.2}", currency_symbol(currency), amount)
}

/// Converted price, with the registrar's own price when it differed.
pub fn format_price(price: &Price) -> String {
    let converted = format_amount(price.amount, &price.currency);
    if price.original_currency == price.currency {
        return converted;
    }

    let mut original = format!(
        "{:.2} {}",
        price.original_amount, price.original_currency
    );
    if price.used_fallback_rate {
        original.push_str(", fallback rate");
    }
    format!("{} ({})", converted, original)
}

/// The one-line verdict, e.g. "The lowest price for example.com is €8.99/yr at Gandi.net".
pub fn best_offer_line(quote: &Quote) -> String {
    let price = quote
        .price()
        .map(|p| format_amount(p.amount, &p.currency))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "The lowest price for {} is {}/yr at {}",
        quote.domain(),
        price,
        quote.registrar()
    )
}

pub fn format_failure(error: &LookupError) -> String {
    match error {
        LookupError::TransportError { .. } => format!("network error: {}", error),
        LookupError::BackendUnavailable { .. } => format!("unavailable: {}", error),
        LookupError::NoPricingData { .. } => format!("no price: {}", error),
    }
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Print every registrar answer followed by the verdict.
pub fn print_aggregate(result: &AggregateResult) {
    let name_width = result
        .all_quotes
        .iter()
        .map(|o| o.registrar.as_str().len())
        .max()
        .unwrap_or(0)
        + 2;

    for outcome in &result.all_quotes {
        let name = pad_str(outcome.registrar.as_str(), name_width, Alignment::Left, None);
        let detail = match &outcome.result {
            Ok(quote) => match quote.price() {
                Some(price) => style(format_price(price)).green().to_string(),
                None => style("not available").dim().to_string(),
            },
            Err(e) => style(format_failure(e)).red().to_string(),
        };
        println!("  {}{}", name, detail);
    }
    println!();

    match &result.best_quote {
        Some(best) => println!("{}", style(best_offer_line(best)).bold()),
        None if result.all_failed() => println!(
            "{}",
            style(format!("No registrar could price {}", result.domain)).yellow()
        ),
        None => println!("No registrar offers {}", result.domain),
    }
}

/// Print the per-TLD table, failures, and the cheapest variant.
pub fn print_sweep(result: &SweepResult) {
    let domain_width = result
        .entries
        .iter()
        .map(|e| e.domain.as_str().len())
        .max()
        .unwrap_or(0)
        + 2;

    for entry in &result.entries {
        let domain = pad_str(entry.domain.as_str(), domain_width, Alignment::Left, None);
        match (&entry.aggregate.best_quote, &entry.registrar) {
            (Some(quote), Some(registrar)) => {
                let price = quote.price().map(format_price).unwrap_or_default();
                println!("  {}{}  {}", domain, style(price).green(), style(registrar).dim());
            }
            _ => println!("  {}{}", domain, style("-").dim()),
        }
    }

    let failures: Vec<String> = result
        .entries
        .iter()
        .flat_map(|entry| {
            entry
                .aggregate
                .failures()
                .map(move |(registrar, e)| {
                    format!("{} via {}: {}", entry.domain, registrar, format_failure(e))
                })
        })
        .collect();

    if !failures.is_empty() {
        println!();
        println!("{}", style("Some lookups failed:").yellow());
        for line in failures {
            println!("  • {}", line);
        }
    }

    println!();
    match &result.cheapest_quote {
        Some(best) => println!("{}", style(best_offer_line(best)).bold()),
        None => println!("No offer found for any TLD of {}", result.base_name),
    }
}
