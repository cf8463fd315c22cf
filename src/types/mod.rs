mod answer_pad;
mod path;
mod questionnaire;
mod response;

pub use answer_pad::*;
pub use path::*;
pub use questionnaire::*;
pub use response::*;
