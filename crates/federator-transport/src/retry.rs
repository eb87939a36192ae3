//! Client-side retryability taxonomy: maps a failed call's
//! `tonic::Status` to retryable vs terminal, the single seam transport
//! errors are classified at.

use tonic::{Code, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    Retryable,
    Terminal,
}

/// Classifies a failed RPC call: `Unavailable, DeadlineExceeded,
/// ResourceExhausted, DataLoss, Cancelled, Aborted, PermissionDenied,
/// Unauthenticated` are retryable; everything else is terminal.
pub fn classify(status: &Status) -> Retryability {
    match status.code() {
        Code::Unavailable
        | Code::DeadlineExceeded
        | Code::ResourceExhausted
        | Code::DataLoss
        | Code::Cancelled
        | Code::Aborted
        | Code::PermissionDenied
        | Code::Unauthenticated => Retryability::Retryable,
        _ => Retryability::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes_are_classified_retryable() {
        for code in [
            Code::Unavailable,
            Code::DeadlineExceeded,
            Code::ResourceExhausted,
            Code::DataLoss,
            Code::Cancelled,
            Code::Aborted,
            Code::PermissionDenied,
            Code::Unauthenticated,
        ] {
            assert_eq!(classify(&Status::new(code, "x")), Retryability::Retryable);
        }
    }

    #[test]
    fn other_codes_are_terminal() {
        for code in [Code::InvalidArgument, Code::NotFound, Code::Internal, Code::Unknown] {
            assert_eq!(classify(&Status::new(code, "x")), Retryability::Terminal);
        }
    }
}
