#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    #[default]
    Linear,
    /// Symmetric quadratic; used for the local blend factor during playback.
    InOutQuad,
    OutCubic,
    /// Symmetric cubic; used for camera fit transitions.
    InOutCubic,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 4] = [Ease::Linear, Ease::InOutQuad, Ease::OutCubic, Ease::InOutCubic];

    #[test]
    fn endpoints_are_stable() {
        for ease in ALL {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
        }
    }

    #[test]
    fn monotonic_spot_check() {
        for ease in ALL {
            let a = ease.apply(0.25);
            let b = ease.apply(0.5);
            let c = ease.apply(0.75);
            assert!(a < b);
            assert!(b < c);
        }
    }

    #[test]
    fn inout_variants_are_symmetric() {
        for ease in [Ease::InOutQuad, Ease::InOutCubic] {
            for t in [0.1, 0.3, 0.45] {
                assert!((ease.apply(t) + ease.apply(1.0 - t) - 1.0).abs() < 1e-12);
            }
        }
    }
}
