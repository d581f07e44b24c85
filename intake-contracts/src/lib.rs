//! Trait surfaces the task-intake core is built against: the admission
//! boundary to the outside world, the business-day predicate injected into
//! the ledger, and the reconnect-alert sink fed by the listener fleet's
//! health monitor.

pub mod acceptor;
pub mod business_day;
pub mod notifier;

pub use acceptor::{AcceptOutcome, Acceptor};
pub use business_day::{BusinessDayPredicate, WeekdayOnly};
pub use notifier::{NullNotifier, ReconnectAlert, ReconnectNotifier};
