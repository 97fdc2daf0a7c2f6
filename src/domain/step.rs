use serde::{Deserialize, Serialize};

/// The screen of the checkout funnel that is currently active.
///
/// Ordinals match the funnel order so steps can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStep {
    #[default]
    ShippingAddress = 1,
    ShippingMethod = 2,
    Payment = 3,
    Review = 4,
}

/// Secondary panel shown next to (or instead of) the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveContent {
    #[default]
    Checkout,
    AddressBook,
    SignIn,
}

impl ActiveContent {
    fn toggled(self, panel: ActiveContent) -> Self {
        if self == ActiveContent::Checkout {
            panel
        } else {
            ActiveContent::Checkout
        }
    }
}

/// A step change applied by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CheckoutStep,
    pub to: CheckoutStep,
    /// The presentation layer should scroll back to the top of the page.
    pub scroll_to_top: bool,
}

/// Tracks the funnel position and the review-requested flag.
///
/// Every completion signal is guarded by an equality check on the current
/// step: signals that arrive out of order are ignored and return `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMachine {
    step: CheckoutStep,
    review_requested: bool,
    active_content: ActiveContent,
}

impl StepMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn review_requested(&self) -> bool {
        self.review_requested
    }

    pub fn active_content(&self) -> ActiveContent {
        self.active_content
    }

    pub fn complete_shipping_address(&mut self) -> Option<Transition> {
        self.advance(CheckoutStep::ShippingAddress, CheckoutStep::ShippingMethod, false)
    }

    pub fn complete_shipping_method(&mut self) -> Option<Transition> {
        self.advance(CheckoutStep::ShippingMethod, CheckoutStep::Payment, false)
    }

    pub fn complete_payment(&mut self) -> Option<Transition> {
        self.advance(CheckoutStep::Payment, CheckoutStep::Review, true)
    }

    /// Marks the review as requested. Only honoured on the payment step.
    pub fn request_review(&mut self) -> bool {
        if self.step != CheckoutStep::Payment || self.review_requested {
            return false;
        }
        self.review_requested = true;
        true
    }

    pub fn reset_review(&mut self) -> bool {
        std::mem::replace(&mut self.review_requested, false)
    }

    pub fn toggle_address_book(&mut self) {
        self.active_content = self.active_content.toggled(ActiveContent::AddressBook);
    }

    pub fn toggle_sign_in(&mut self) {
        self.active_content = self.active_content.toggled(ActiveContent::SignIn);
    }

    pub fn collapse_panel(&mut self) -> bool {
        std::mem::replace(&mut self.active_content, ActiveContent::Checkout)
            != ActiveContent::Checkout
    }

    /// Returns the funnel to its entry point after a confirmed order.
    pub fn reset_after_confirmation(&mut self) {
        self.step = CheckoutStep::ShippingAddress;
        self.review_requested = false;
        self.active_content = ActiveContent::Checkout;
    }

    fn advance(
        &mut self,
        expected: CheckoutStep,
        next: CheckoutStep,
        scroll_to_top: bool,
    ) -> Option<Transition> {
        if self.step != expected {
            return None;
        }
        self.step = next;
        Some(Transition {
            from: expected,
            to: next,
            scroll_to_top,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_at(step: CheckoutStep) -> StepMachine {
        StepMachine {
            step,
            ..StepMachine::default()
        }
    }

    #[test]
    fn test_full_funnel_progression() {
        let mut machine = StepMachine::new();
        assert_eq!(machine.step(), CheckoutStep::ShippingAddress);

        machine.complete_shipping_address().unwrap();
        machine.complete_shipping_method().unwrap();
        let transition = machine.complete_payment().unwrap();

        assert_eq!(machine.step(), CheckoutStep::Review);
        assert_eq!(transition.from, CheckoutStep::Payment);
        assert!(transition.scroll_to_top);
    }

    #[test]
    fn test_out_of_order_signals_are_noops() {
        let mut machine = StepMachine::new();
        assert!(machine.complete_payment().is_none());
        assert!(machine.complete_shipping_method().is_none());
        assert_eq!(machine.step(), CheckoutStep::ShippingAddress);

        let mut machine = machine_at(CheckoutStep::Review);
        assert!(machine.complete_shipping_address().is_none());
        assert_eq!(machine.step(), CheckoutStep::Review);
    }

    #[test]
    fn test_only_payment_transition_scrolls() {
        let mut machine = StepMachine::new();
        let transition = machine.complete_shipping_address().unwrap();
        assert!(!transition.scroll_to_top);
    }

    #[test]
    fn test_review_request_requires_payment_step() {
        let mut machine = machine_at(CheckoutStep::ShippingMethod);
        assert!(!machine.request_review());
        assert!(!machine.review_requested());

        let mut machine = machine_at(CheckoutStep::Payment);
        assert!(machine.request_review());
        assert!(machine.review_requested());
        // Resetting the flag leaves the step alone.
        assert!(machine.reset_review());
        assert!(!machine.review_requested());
        assert_eq!(machine.step(), CheckoutStep::Payment);
    }

    #[test]
    fn test_panel_toggles() {
        let mut machine = StepMachine::new();
        machine.toggle_address_book();
        assert_eq!(machine.active_content(), ActiveContent::AddressBook);
        machine.toggle_sign_in();
        assert_eq!(machine.active_content(), ActiveContent::Checkout);
        machine.toggle_sign_in();
        assert_eq!(machine.active_content(), ActiveContent::SignIn);
        assert!(machine.collapse_panel());
        assert!(!machine.collapse_panel());
    }

    #[test]
    fn test_reset_after_confirmation() {
        let mut machine = machine_at(CheckoutStep::Payment);
        machine.request_review();
        machine.toggle_address_book();
        machine.complete_payment();

        machine.reset_after_confirmation();
        assert_eq!(machine, StepMachine::new());
    }
}
