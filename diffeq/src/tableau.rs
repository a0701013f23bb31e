/// Coefficients of an explicit Runge-Kutta method.
///
/// `b` propagates the solution. `b_tilde`, when present, is the embedded
/// lower order solution used only for the local error estimate.
pub struct ButcherTableau<const STAGES: usize> {
    pub name: &'static str,
    pub a: [[f64; STAGES]; STAGES],
    pub b: [f64; STAGES],
    pub b_tilde: Option<[f64; STAGES]>,
    pub c: [f64; STAGES],
    /// Order of the solution propagated with `b`.
    pub order: usize,
    /// Order of the embedded solution, drives the step size exponent.
    pub embedded_order: Option<usize>,
}

impl ButcherTableau<4> {
    // usage is ButcherTableau::<4>::RK4
    pub const RK4: Self = Self {
        name: "Rk4",
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 1. / 2., 0., 0.],
            [0., 0., 1., 0.],
        ],
        b: [1. / 6., 1. / 3., 1. / 3., 1. / 6.],
        b_tilde: None,
        c: [0., 1. / 2., 1. / 2., 1.],
        order: 4,
        embedded_order: None,
    };

    pub const BOGACKISHAMPINE32: Self = Self {
        name: "BogackiShampine32",
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 3. / 4., 0., 0.],
            [2. / 9., 1. / 3., 4. / 9., 0.],
        ],
        b: [2. / 9., 1. / 3., 4. / 9., 0.],
        b_tilde: Some([7. / 24., 1. / 4., 1. / 3., 1. / 8.]),
        c: [0., 1. / 2., 3. / 4., 1.],
        order: 3,
        embedded_order: Some(2),
    };
}

impl ButcherTableau<7> {
    // usage is ButcherTableau::<7>::DORMANDPRINCE45
    pub const DORMANDPRINCE45: Self = Self {
        name: "DoPri45",
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [1. / 5., 0., 0., 0., 0., 0., 0.],
            [3. / 40., 9. / 40., 0., 0., 0., 0., 0.],
            [44. / 45., -56. / 15., 32. / 9., 0., 0., 0., 0.],
            [
                19372. / 6561.,
                -25360. / 2187.,
                64448. / 6561.,
                -212. / 729.,
                0.,
                0.,
                0.,
            ],
            [
                9017. / 3168.,
                -355. / 33.,
                46732. / 5247.,
                49. / 176.,
                -5103. / 18656.,
                0.,
                0.,
            ],
            [
                35. / 384.,
                0.,
                500. / 1113.,
                125. / 192.,
                -2187. / 6784.,
                11. / 84.,
                0.,
            ],
        ],
        b: [
            35. / 384.,
            0.,
            500. / 1113.,
            125. / 192.,
            -2187. / 6784.,
            11. / 84.,
            0.,
        ],
        b_tilde: Some([
            5179. / 57600.,
            0.,
            7571. / 16695.,
            393. / 640.,
            -92097. / 339200.,
            187. / 2100.,
            1. / 40.,
        ]),
        c: [0., 1. / 5., 3. / 10., 4. / 5., 8. / 9., 1., 1.],
        order: 5,
        embedded_order: Some(4),
    };
}
