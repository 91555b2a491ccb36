//! Model-job lifecycle status enum.
//!
//! Stored as a lowercase TEXT column; the variant names are the
//! Portuguese labels the admin client renders verbatim. Every
//! externally reported provider status is mapped into this enum before
//! it touches a job row, never passed through raw.

use crate::error::CoreError;

/// Lifecycle status of a [`ModelJob`](crate::job).
///
/// ```text
/// enviado -> processando -> revisao -> publicado
///                 \-> erro
/// ```
///
/// `triagem` is an advisory state reachable only through a direct
/// edit, never set by the automated pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelJobStatus {
    /// Created, no provider task submitted yet.
    Enviado,
    /// Provider task running.
    Processando,
    /// Manual triage (direct edit only).
    Triagem,
    /// Provider succeeded, artifacts fetched, awaiting human approval.
    Revisao,
    /// Approved; the linked item has been updated.
    Publicado,
    /// Submission or polling failed.
    Erro,
}

impl ModelJobStatus {
    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enviado => "enviado",
            Self::Processando => "processando",
            Self::Triagem => "triagem",
            Self::Revisao => "revisao",
            Self::Publicado => "publicado",
            Self::Erro => "erro",
        }
    }

    /// Parse from the database `status` column or a client payload.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "enviado" => Ok(Self::Enviado),
            "processando" => Ok(Self::Processando),
            "triagem" => Ok(Self::Triagem),
            "revisao" => Ok(Self::Revisao),
            "publicado" => Ok(Self::Publicado),
            "erro" => Ok(Self::Erro),
            other => Err(CoreError::Validation(format!(
                "Unknown model job status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ModelJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for status in [
            ModelJobStatus::Enviado,
            ModelJobStatus::Processando,
            ModelJobStatus::Triagem,
            ModelJobStatus::Revisao,
            ModelJobStatus::Publicado,
            ModelJobStatus::Erro,
        ] {
            assert_eq!(ModelJobStatus::from_name(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(ModelJobStatus::from_name("SUCCEEDED").is_err());
        assert!(ModelJobStatus::from_name("").is_err());
    }
}
