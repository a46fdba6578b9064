//! # rusty-forms-live - Live form validation
//!
//! Validates form fields as the user types, checks values against a server
//! after input pauses and keeps the submit control in step with the form.
//!
//! ## Features
//!
//! - **Named Validators**: built-in `native`, `match` and `minlength` rules plus custom ones
//! - **Debounced Display**: errors from live typing appear once input pauses
//! - **Remote Checks**: asynchronous server checks where only the newest answer counts
//! - **Submit Gate**: the submit control is disabled while the form is invalid or incomplete
//!
//! ## Example
//!
//! ```rust
//! use rusty_forms_live::{FieldDescriptor, FieldValue, FormEngine, FormOptions, InputTrigger};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = FormEngine::initialize(
//!         [
//!             FieldDescriptor::scalar("password").required().min_length(8),
//!             FieldDescriptor::scalar("confirm").matches("password"),
//!         ],
//!         FormOptions::default().with_delay(0),
//!     )
//!     .unwrap();
//!
//!     engine
//!         .on_input("password", FieldValue::text("longenough"), InputTrigger::Input)
//!         .await
//!         .unwrap();
//!     engine
//!         .on_input("confirm", FieldValue::text("longenough"), InputTrigger::Input)
//!         .await
//!         .unwrap();
//!
//!     assert!(!engine.has_errors());
//! }
//! ```

pub mod config;
pub mod constraint;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod events;
pub mod field;
pub mod registry;
pub mod remote;
pub mod render;
pub mod result;
pub mod runner;
pub mod state;

pub use config::{ErrorTemplates, FeedbackMarkers, FormOptions};
pub use constraint::{ConstraintCheck, Html5Constraints, Validity, ValidityReason};
pub use debounce::DebounceScheduler;
pub use engine::{FormEngine, FormEngineBuilder, InputTrigger, SubmitDecision};
pub use error::{ConfigError, EngineError, RemoteCheckFailure};
pub use events::{BroadcastBus, EventBus, FieldEvent, Propagation};
pub use field::{FieldDescriptor, FieldValue, InputType, ValueKind};
pub use registry::{FieldContext, Validator, ValidatorRegistry, Verdict};
pub use remote::{HttpTransport, RemoteChecker, RemoteTransport};
pub use render::{MemoryRenderer, MessageFormat, Renderer};
pub use result::ValidationResult;
pub use runner::ValidationRunner;
pub use state::FieldStatus;
