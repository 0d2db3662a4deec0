//! Auxiliary behaviors: validation, authorization, logging, performance and transactions.
//!
//! | Behavior | Applies to | Short-circuits with |
//! |----------|------------|---------------------|
//! | [`AuthorizationBehavior`] | `AUTHORIZABLE` | `Unauthenticated`, `Forbidden` |
//! | [`ValidationBehavior`] | types with registered validators | `Validation` |
//! | [`PerformanceBehavior`] | `INTERVAL_CHECKED` | never |
//! | [`LoggingBehavior`] | `LOGGABLE` | never |
//! | [`TransactionBehavior`] | `TRANSACTIONAL` | never; rolls back on failure |

pub mod authorization;
pub mod logging;
pub mod performance;
pub mod transaction;
pub mod validation;

pub use authorization::{AuthorizationBehavior, ADMIN_ROLE};
pub use logging::{LogDetail, LogParameter, LoggingBehavior};
pub use performance::PerformanceBehavior;
pub use transaction::{NoopTransactions, TransactionBehavior, TransactionProvider, TransactionScope};
pub use validation::{FieldError, ValidationBehavior, Validator};
