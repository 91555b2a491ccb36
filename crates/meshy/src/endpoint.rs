//! Meshy generation endpoints.
//!
//! The vendor exposes separate endpoints for single-image and
//! multi-image generation with the same task semantics. Selection by
//! image arity is a provider quirk hidden behind the client's single
//! `submit` call.

/// A Meshy generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /openapi/v1/image-to-3d` — exactly one input image.
    ImageTo3d,
    /// `POST /openapi/v1/multi-image-to-3d` — two or more input images.
    MultiImageTo3d,
}

impl Endpoint {
    /// URL path of this endpoint, also used as the stored
    /// `provider_task_endpoint` value.
    pub fn path(self) -> &'static str {
        match self {
            Self::ImageTo3d => "/openapi/v1/image-to-3d",
            Self::MultiImageTo3d => "/openapi/v1/multi-image-to-3d",
        }
    }

    /// Parse a stored `provider_task_endpoint` value.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/openapi/v1/image-to-3d" => Some(Self::ImageTo3d),
            "/openapi/v1/multi-image-to-3d" => Some(Self::MultiImageTo3d),
            _ => None,
        }
    }

    /// The other known endpoint, tried when a poll hits a 404.
    pub fn alternate(self) -> Self {
        match self {
            Self::ImageTo3d => Self::MultiImageTo3d,
            Self::MultiImageTo3d => Self::ImageTo3d,
        }
    }

    /// Select the submission endpoint from the number of input images.
    pub fn for_image_count(count: usize) -> Self {
        if count > 1 {
            Self::MultiImageTo3d
        } else {
            Self::ImageTo3d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_arity_based() {
        assert_eq!(Endpoint::for_image_count(1), Endpoint::ImageTo3d);
        assert_eq!(Endpoint::for_image_count(2), Endpoint::MultiImageTo3d);
        assert_eq!(Endpoint::for_image_count(4), Endpoint::MultiImageTo3d);
    }

    #[test]
    fn path_round_trips() {
        for ep in [Endpoint::ImageTo3d, Endpoint::MultiImageTo3d] {
            assert_eq!(Endpoint::from_path(ep.path()), Some(ep));
        }
        assert_eq!(Endpoint::from_path("/openapi/v1/text-to-3d"), None);
    }

    #[test]
    fn alternate_flips() {
        assert_eq!(Endpoint::ImageTo3d.alternate(), Endpoint::MultiImageTo3d);
        assert_eq!(Endpoint::MultiImageTo3d.alternate(), Endpoint::ImageTo3d);
    }
}
