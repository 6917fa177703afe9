use tracing::warn;

use super::Response;
use crate::keyword::KeywordError;
use crate::visual::VisualError;
use crate::visual::surface::SurfaceError;

pub(super) fn visual_to_response(e: VisualError) -> Response {
    match &e {
        VisualError::MissingImage => Response::error(e.to_string()),
        VisualError::Surface(SurfaceError::Unavailable(_)) => {
            warn!(error = %e, "visual search could not start");
            Response::error(format!("{e} (retriable)"))
        }
        VisualError::Surface(_) => {
            warn!(error = %e, "visual search failed");
            Response::error(e.to_string())
        }
    }
}

pub(super) fn keyword_to_response(e: KeywordError) -> Response {
    match &e {
        KeywordError::EmptyQuery => Response::error(e.to_string()),
        KeywordError::Status(code) if *code == 429 || *code >= 500 => {
            warn!(error = %e, "catalog unavailable");
            Response::error(format!("{e} (retriable)"))
        }
        _ => {
            warn!(error = %e, "catalog search failed");
            Response::error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Status;

    #[test]
    fn missing_image_is_plain_error() {
        let resp = visual_to_response(VisualError::MissingImage);
        assert_eq!(resp.status, Status::Error);
        assert_eq!(resp.message.as_deref(), Some("No image URL provided"));
        assert!(resp.results.is_none());
    }

    #[test]
    fn unavailable_surface_is_retriable() {
        let resp = visual_to_response(VisualError::Surface(SurfaceError::Unavailable(
            "no window".into(),
        )));
        assert!(resp.message.unwrap().contains("retriable"));
    }

    #[test]
    fn catalog_5xx_is_retriable() {
        let resp = keyword_to_response(KeywordError::Status(502));
        assert!(resp.message.unwrap().contains("retriable"));
    }

    #[test]
    fn catalog_404_is_not_retriable() {
        let resp = keyword_to_response(KeywordError::Status(404));
        assert!(!resp.message.unwrap().contains("retriable"));
    }
}
