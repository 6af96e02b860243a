//! Overlay markers: passage links and tab-stop placeholders.
//!
//! # Responsibility
//! - Scan buffer text for links and placeholders.
//! - Reconcile rendered markers with the scan result at minimal churn.
//! - Tie every marker listener to its marker's lifetime.
//!
//! # See also
//! - surface::events for the listener registry markers attach to.

pub mod handle;
pub mod link;
pub mod placeholder;
pub mod reconciler;
