mod generation;
pub mod http;

pub use generation::{media_type_for, GeneratedPrompt, GenerationClient, JobBuildError};
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
