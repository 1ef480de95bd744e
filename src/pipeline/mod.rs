pub mod modules;
pub mod normalize;
pub mod reference;
pub mod sanity;
pub mod service; // raw input → AnalysisResponse

pub use service::{
    AnalysisRequest, AnalysisResponse, AnyReportRequest, AnyReportResponse, ServiceError,
    ServiceRequest, ThirdOpService,
};
