use ndarray::{Array1, ArrayView1};

use crate::analysis::AnalysisError;

/// The three signal channels after the reference channel has been subtracted.
#[derive(Clone, Debug, PartialEq)]
pub struct Rereferenced {
    pub eeg: Array1<f64>,
    pub eogl: Array1<f64>,
    pub eogr: Array1<f64>,
}

/// Subtract `reference` from each signal channel, sample by sample.
pub fn rereference(
    eeg: ArrayView1<f64>,
    eogl: ArrayView1<f64>,
    eogr: ArrayView1<f64>,
    reference: ArrayView1<f64>,
) -> Result<Rereferenced, AnalysisError> {
    let expected = eeg.len();
    for (channel, len) in [
        ("eogl", eogl.len()),
        ("eogr", eogr.len()),
        ("reference", reference.len()),
    ] {
        if len != expected {
            return Err(AnalysisError::LengthMismatch {
                channel,
                expected,
                actual: len,
            });
        }
    }
    Ok(Rereferenced {
        eeg: &eeg - &reference,
        eogl: &eogl - &reference,
        eogr: &eogr - &reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    #[test]
    fn subtracts_reference_from_every_channel() {
        let eeg = array![1.0, 2.0, 3.0];
        let eogl = array![0.0, 0.0, 0.0];
        let eogr = array![5.0, 5.0, 5.0];
        let reference = array![1.0, 1.0, 2.0];
        let out = rereference(eeg.view(), eogl.view(), eogr.view(), reference.view()).unwrap();
        assert_eq!(out.eeg, array![0.0, 1.0, 1.0]);
        assert_eq!(out.eogl, array![-1.0, -1.0, -2.0]);
        assert_eq!(out.eogr, array![4.0, 4.0, 3.0]);
    }
    #[test]
    fn identical_eeg_and_reference_cancel() {
        let signal = Array1::linspace(-3.0, 7.0, 64);
        let zeros = Array1::<f64>::zeros(64);
        let out = rereference(signal.view(), zeros.view(), zeros.view(), signal.view()).unwrap();
        assert!(out.eeg.iter().all(|&v| v == 0.0));
    }
    #[test]
    fn mismatched_lengths_are_rejected() {
        let a = Array1::<f64>::zeros(10);
        let b = Array1::<f64>::zeros(9);
        let err = rereference(a.view(), a.view(), a.view(), b.view()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::LengthMismatch {
                channel: "reference",
                expected: 10,
                actual: 9
            }
        );
    }
}
