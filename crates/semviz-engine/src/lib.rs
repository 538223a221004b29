//! semviz engine: evaluate user-authored actions over a grammar trace.
//!
//! A [`Session`] owns everything that outlives a single walk: the loaded
//! trace, the [`ActionRegistry`], the [`NavigationStack`] and the
//! [`RefreshScheduler`]. Each refresh builds a fresh [`MemoStore`], picks the
//! focused subtree and walks it, emitting one [`DrawRequest`] per visited
//! node.
//!
//! # Example
//!
//! ```
//! use semviz_engine::{ActionKind, Session, SessionConfig};
//! use semviz_types::pexpr::PExpr;
//! use semviz_types::trace::TraceBuilder;
//!
//! let mut b = TraceBuilder::new("7");
//! b.rule("Num", PExpr::range('0', '9'));
//! let digit = b.range(0, '0', '9');
//! let num = b.apply("Num", digit);
//! let trace = b.finish(num).unwrap();
//!
//! let mut session = Session::new(SessionConfig::default());
//! let root = trace.root;
//! session.load_trace(trace);
//! session.add_action("value", ActionKind::Operation).unwrap();
//! session.save_action(root, "convert.to_number($1) * 2", &[]).unwrap();
//!
//! let mut draws: Vec<semviz_engine::DrawRequest> = Vec::new();
//! let report = session.refresh(&mut draws).unwrap();
//! assert!(report.errors.is_empty());
//! let panel = draws[0].panel.as_ref().unwrap();
//! assert_eq!(panel.result, semviz_engine::ResultView::value(&14.0.into()));
//! ```

pub mod config;
mod error;
mod evaluate;
mod key;
mod memo;
pub mod navigation;
mod registry;
pub mod scheduler;
mod session;
pub mod walk;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use evaluate::Evaluator;
pub use key::NodeKey;
pub use memo::{ErrorWrapper, MemoStore, Outcome};
pub use navigation::{Frame, NavigationStack};
pub use registry::{ActionDefinition, ActionKind, ActionRegistry};
pub use scheduler::RefreshScheduler;
pub use session::{SaveOutcome, Session};
pub use walk::{ActionPanel, DrawRequest, DrawSink, ResultView, SurfacedError, WalkReport};
