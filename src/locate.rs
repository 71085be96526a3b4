//! Picking the VT to run on.

use log::warn;

use crate::error::VtError;
use crate::terminal::Kernel;

/// Find the VT to claim.
///
/// An explicit VT that parses as a non-negative number is returned as is,
/// even if no such VT exists: opening or claiming it will fail later. A
/// negative number is rejected. Anything else, or no explicit VT at all, asks
/// the kernel for a free VT.
///
/// # Arguments
///
/// * `kernel` - Kernel to query for a free VT
/// * `explicit_vt` - VT supplied by the environment or the command line
///
/// # Errors
///
/// Returns an error if the explicit VT is negative, or if the kernel has to be
/// asked and the console control device cannot be opened or queried.
pub fn locate<K: Kernel>(kernel: &K, explicit_vt: Option<&str>) -> Result<u32, VtError> {
    if let Some(vt_string) = explicit_vt {
        match vt_string.parse::<i32>() {
            Ok(vt) => {
                return u32::try_from(vt)
                    .map_err(|_| VtError::invalid(format!("vt{vt} is negative")));
            }
            Err(_) => warn!("Invalid vt '{vt_string}', trying to find free vt"),
        }
    }

    kernel.free_vt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, Console, MockKernel};

    #[test]
    fn test_explicit_vt_is_used_verbatim() -> Result<(), VtError> {
        let kernel = MockKernel::default();
        assert_eq!(locate(&kernel, Some("7"))?, 7);
        // validation happens when the vt is opened
        assert_eq!(locate(&kernel, Some("99"))?, 99);
        assert_eq!(locate(&kernel, Some("0"))?, 0);
        assert!(kernel.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_unparsable_vt_falls_back_to_free_vt() -> Result<(), VtError> {
        let kernel = MockKernel::default();
        assert_eq!(locate(&kernel, Some("abc"))?, 3);
        assert_eq!(locate(&kernel, Some(""))?, 3);
        assert_eq!(kernel.calls(), vec![Call::FreeVt; 2]);
        Ok(())
    }

    #[test]
    fn test_negative_vt_is_rejected() {
        let kernel = MockKernel::default();
        let err = locate(&kernel, Some("-2")).unwrap_err();
        assert!(matches!(err, VtError::InvalidVt { .. }));
        assert_eq!(err.to_string(), "not a valid vt: vt-2 is negative");
        assert!(kernel.calls().is_empty());
    }

    #[test]
    fn test_no_vt_asks_the_kernel() -> Result<(), VtError> {
        let kernel = MockKernel::new(Console {
            free_vt: Some(5),
            ..Console::default()
        });
        assert_eq!(locate(&kernel, None)?, 5);
        assert_eq!(kernel.calls(), vec![Call::FreeVt]);
        Ok(())
    }

    #[test]
    fn test_free_vt_query_failure() {
        let kernel = MockKernel::new(Console {
            free_vt: None,
            ..Console::default()
        });
        let err = locate(&kernel, None).unwrap_err();
        assert!(matches!(err, VtError::KernelQuery { .. }));
    }
}
