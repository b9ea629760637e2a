//! Residual equations `(fn, gn)` and their analytic Jacobian in `(mu, sigma)`.
//!
//! `fn` and `gn` are the first-order conditions of the WSB likelihood once lambda is
//! profiled out. With `D = (1 + mhat) Φ(xt) - E[Φ(x)]`:
//!
//! ```text
//! fn = D E[x]          - E[φ(x)]   + (1 + mhat) φ(xt)
//! gn = D (E[x²] - 1)   - E[x φ(x)] + (1 + mhat) xt φ(xt)
//! ```

use nalgebra::{Matrix2, Vector2};

use crate::statistics::IterationStatistics;

/// Residual vector `F = [fn, gn]` and Jacobian `J = [[dfn/dmu, dfn/dsigma], [dgn/dmu, dgn/dsigma]]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonSystem {
    pub residual: Vector2<f64>,
    pub jacobian: Matrix2<f64>,
}

impl NewtonSystem {
    /// Assembles the system from one iteration's sums.
    pub fn from_statistics(s: &IterationStatistics) -> Self {
        let scale = 1.0 + s.mhat;
        let cdf_t = s.cdf_t();
        let pdf_t = s.pdf_t();
        let xt = s.xt;
        let exposure = s.exposure();

        let fn_value = exposure * s.mean_x - s.mean_pdf + scale * pdf_t;
        let gn_value = exposure * (s.mean_x_sqrd - 1.0) - s.mean_x_pdf + scale * xt * pdf_t;

        let df_dmu = (scale * ((xt - s.mean_x) * pdf_t - cdf_t) + s.mean_x * s.mean_pdf
            - s.mean_x_pdf
            + s.mean_cdf)
            / s.sigma;

        let df_dsigma = (scale * ((xt - s.mean_x) * xt * pdf_t - s.mean_x * cdf_t)
            + s.mean_x * (s.mean_x_pdf + s.mean_cdf)
            - s.mean_x_sqrd_pdf)
            / s.sigma;

        let dg_dmu = (scale * (2.0 * s.mean_x * cdf_t + (s.mean_x_sqrd - xt * xt) * pdf_t)
            - (2.0 * s.mean_x * s.mean_cdf + s.mean_x_sqrd * s.mean_pdf - s.mean_x_sqrd_pdf))
            / -s.sigma;

        let dg_dsigma = (scale
            * (xt.powi(3) * pdf_t - s.mean_x_sqrd * xt * pdf_t - 2.0 * s.mean_x_sqrd * cdf_t)
            + 2.0 * s.mean_x_sqrd * s.mean_cdf
            + s.mean_x_sqrd * s.mean_x_pdf
            - s.mean_x_cubed_pdf)
            / s.sigma;

        Self {
            residual: Vector2::new(fn_value, gn_value),
            jacobian: Matrix2::new(df_dmu, df_dsigma, dg_dmu, dg_dsigma),
        }
    }

    /// First residual, the mu condition.
    pub fn fn_value(&self) -> f64 {
        self.residual[0]
    }

    /// Second residual, the sigma condition.
    pub fn gn_value(&self) -> f64 {
        self.residual[1]
    }

    pub fn is_finite(&self) -> bool {
        self.residual.iter().all(|v| v.is_finite()) && self.jacobian.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::statistics::TrialParameters;
    use crate::timeline::{Timeline, TimelineBuilder};

    fn system_at(timeline: &Timeline, mu: f64, sigma: f64, m: f64) -> NewtonSystem {
        let stats =
            IterationStatistics::evaluate(timeline, TrialParameters::new(mu, sigma), m).unwrap();
        NewtonSystem::from_statistics(&stats)
    }

    #[test]
    fn jacobian_matches_central_differences() {
        let timeline = TimelineBuilder::from_counts(&[3, 9, 14, 11, 8, 6, 4, 3, 2, 1])
            .build()
            .unwrap();
        let m = 20.0;
        let h = 1e-6;

        for &(mu, sigma) in &[(6.5, 1.0), (7.2, 0.6), (5.0, 2.0)] {
            let system = system_at(&timeline, mu, sigma, m);

            let plus_mu = system_at(&timeline, mu + h, sigma, m).residual;
            let minus_mu = system_at(&timeline, mu - h, sigma, m).residual;
            let plus_sigma = system_at(&timeline, mu, sigma + h, m).residual;
            let minus_sigma = system_at(&timeline, mu, sigma - h, m).residual;

            let d_mu = (plus_mu - minus_mu) / (2.0 * h);
            let d_sigma = (plus_sigma - minus_sigma) / (2.0 * h);

            let tol = 1e-5;
            assert_relative_eq!(system.jacobian[(0, 0)], d_mu[0], epsilon = tol, max_relative = tol);
            assert_relative_eq!(system.jacobian[(1, 0)], d_mu[1], epsilon = tol, max_relative = tol);
            assert_relative_eq!(system.jacobian[(0, 1)], d_sigma[0], epsilon = tol, max_relative = tol);
            assert_relative_eq!(system.jacobian[(1, 1)], d_sigma[1], epsilon = tol, max_relative = tol);
        }
    }

    #[test]
    fn residuals_follow_closed_form() {
        let timeline = TimelineBuilder::new(vec![(0, 2), (1, 3)]).build().unwrap();
        let stats =
            IterationStatistics::evaluate(&timeline, TrialParameters::new(6.0, 1.0), 10.0).unwrap();
        let system = NewtonSystem::from_statistics(&stats);

        let d = (1.0 + stats.mhat) * stats.cdf_t() - stats.mean_cdf;
        let expected_fn = d * stats.mean_x - stats.mean_pdf + (1.0 + stats.mhat) * stats.pdf_t();
        assert_relative_eq!(system.fn_value(), expected_fn, epsilon = 1e-14);
        assert!(system.is_finite());
    }
}
