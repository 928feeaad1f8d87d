//! Stable-isotope masses and natural abundances, keyed by element symbol.
//!
//! Within each element the isotopes are listed in increasing mass order; that
//! order is the one configuration signatures are written in. Abundances of
//! one element sum to 1.

/// Isotope table of a single element.
#[derive(Clone, Copy, Debug)]
pub struct ElementIsotopes {
    /// Element symbol, e.g. `"C"`.
    pub symbol: &'static str,
    /// Isotope masses in daltons.
    pub masses: &'static [f64],
    /// Natural abundances; sum to 1.
    pub abundances: &'static [f64],
}

macro_rules! element {
    ($symbol:literal, [$($mass:expr),+], [$($ab:expr),+]) => {
        ElementIsotopes {
            symbol: $symbol,
            masses: &[$($mass),+],
            abundances: &[$($ab),+],
        }
    };
}

/// The elements the formula parser understands.
pub static ELEMENTS: &[ElementIsotopes] = &[
    element!("H", [1.00782503207, 2.0141017778], [0.999885, 0.000115]),
    element!("He", [3.0160293191, 4.00260325415], [0.00000134, 0.99999866]),
    element!("Li", [6.015122795, 7.01600455], [0.0759, 0.9241]),
    element!("Be", [9.0121822], [1.0]),
    element!("B", [10.0129370, 11.0093054], [0.199, 0.801]),
    element!("C", [12.0, 13.0033548378], [0.989212, 0.010788]),
    element!("N", [14.0030740048, 15.0001088982], [0.99636, 0.00364]),
    element!(
        "O",
        [15.99491461956, 16.99913170, 17.9991610],
        [0.99757, 0.00038, 0.00205]
    ),
    element!("F", [18.99840322], [1.0]),
    element!(
        "Ne",
        [19.9924401754, 20.99384668, 21.991385114],
        [0.9048, 0.0027, 0.0925]
    ),
    element!("Na", [22.9897692809], [1.0]),
    element!(
        "Mg",
        [23.985041700, 24.98583692, 25.982592929],
        [0.7899, 0.1000, 0.1101]
    ),
    element!("Al", [26.98153863], [1.0]),
    element!(
        "Si",
        [27.9769265325, 28.976494700, 29.97377017],
        [0.92223, 0.04685, 0.03092]
    ),
    element!("P", [30.97376163], [1.0]),
    element!(
        "S",
        [31.97207100, 32.97145876, 33.96786690, 35.96708076],
        [0.9499, 0.0075, 0.0425, 0.0001]
    ),
    element!("Cl", [34.96885268, 36.96590259], [0.7576, 0.2424]),
    element!(
        "Ar",
        [35.967545106, 37.9627324, 39.9623831225],
        [0.003365, 0.000632, 0.996003]
    ),
    element!(
        "K",
        [38.96370668, 39.96399848, 40.96182576],
        [0.932581, 0.000117, 0.067302]
    ),
    element!(
        "Ca",
        [
            39.96259098,
            41.95861801,
            42.9587666,
            43.9554818,
            45.9536926,
            47.952534
        ],
        [0.96941, 0.00647, 0.00135, 0.02086, 0.00004, 0.00187]
    ),
    element!(
        "Fe",
        [53.9396105, 55.9349375, 56.9353940, 57.9332756],
        [0.05845, 0.91754, 0.02119, 0.00282]
    ),
    element!("Cu", [62.9295975, 64.9277895], [0.6915, 0.3085]),
    element!(
        "Zn",
        [63.9291422, 65.9260334, 66.9271273, 67.9248442, 69.9253193],
        [0.4863, 0.2790, 0.0410, 0.1875, 0.0062]
    ),
    element!(
        "Se",
        [
            73.9224764,
            75.9192136,
            76.9199140,
            77.9173091,
            79.9165213,
            81.9166994
        ],
        [0.0089, 0.0937, 0.0763, 0.2377, 0.4961, 0.0873]
    ),
    element!("Br", [78.9183371, 80.9162906], [0.5069, 0.4931]),
    element!("Ag", [106.905097, 108.904752], [0.51839, 0.48161]),
    element!(
        "Sn",
        [
            111.904818,
            113.902779,
            114.903342,
            115.901741,
            116.902952,
            117.901603,
            118.903308,
            119.9021947,
            121.9034390,
            123.9052739
        ],
        [0.0097, 0.0066, 0.0034, 0.1454, 0.0768, 0.2422, 0.0859, 0.3258, 0.0463, 0.0579]
    ),
    element!("I", [126.904473], [1.0]),
    element!("Au", [196.9665687], [1.0]),
    element!(
        "Hg",
        [
            195.965833,
            197.966769,
            198.968280,
            199.968326,
            200.970302,
            201.970643,
            203.973494
        ],
        [0.0015, 0.0997, 0.1687, 0.2310, 0.1318, 0.2986, 0.0687]
    ),
    element!(
        "Pb",
        [203.9730436, 205.9744653, 206.9758969, 207.9766521],
        [0.014, 0.241, 0.221, 0.524]
    ),
];

/// Look up an element by symbol.
pub fn lookup(symbol: &str) -> Option<&'static ElementIsotopes> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}
