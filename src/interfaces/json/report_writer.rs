use crate::application::session::CheckoutView;
use crate::domain::cart::CartId;
use crate::domain::step::CheckoutStep;
use crate::error::Result;
use crate::infrastructure::in_memory::JournalEntry;
use serde::Serialize;
use std::io::Write;

/// Final state of a replayed session.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename = "summary")]
struct Summary<'a> {
    step: CheckoutStep,
    cart_id: Option<&'a CartId>,
    order_number: Option<&'a str>,
    error: Option<&'a str>,
    payment_methods: Vec<&'a str>,
    cleanup_warnings: &'a [String],
}

/// Writes a session report as JSON lines.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_entries(&mut self, entries: &[JournalEntry]) -> Result<()> {
        for entry in entries {
            self.write_line(entry)?;
        }
        Ok(())
    }

    pub fn write_summary(&mut self, view: &CheckoutView) -> Result<()> {
        let summary = Summary {
            step: view.step,
            cart_id: view.cart_id.as_ref(),
            order_number: view.order_number.as_deref(),
            error: view.error.as_ref().map(|error| error.message.as_str()),
            payment_methods: view
                .available_payment_methods
                .iter()
                .map(|method| method.code.as_str())
                .collect(),
            cleanup_warnings: &view.cleanup_warnings,
        };
        self.write_line(&summary)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::AnalyticsEvent;
    use crate::domain::order::NavigationTarget;

    #[test]
    fn test_entries_are_json_lines() {
        let entries = vec![
            JournalEntry::Event {
                event: AnalyticsEvent::CheckoutReviewButtonClicked {
                    cart_id: Some(CartId::new("cart-1")),
                },
            },
            JournalEntry::Navigation {
                navigation: NavigationTarget::CheckoutEntry {
                    route: "/checkout".to_string(),
                },
            },
        ];

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer).write_entries(&entries).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "event");
        assert_eq!(lines[0]["event"]["type"], "CHECKOUT_REVIEW_BUTTON_CLICKED");
        assert_eq!(lines[1]["kind"], "navigation");
        assert_eq!(lines[1]["navigation"]["target"], "checkout_entry");
        assert_eq!(lines[1]["navigation"]["route"], "/checkout");
    }
}
