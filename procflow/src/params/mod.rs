//! Parameter descriptors.
//!
//! A [`Parameter`] carries the value-resolution logic for one operation
//! argument. Presentation concerns live apart from it: [`UiHints`] holds
//! what a front end needs to pick a control, and [`ParamView`] is the
//! read-only snapshot it renders from.

mod descriptor;
mod view;
mod widget;

pub use descriptor::{Bound, Parameter, Range};
pub use view::{BindingView, ParamView, StageView};
pub use widget::{UiHints, WidgetKind};
