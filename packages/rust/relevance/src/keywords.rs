//! Built-in term lists for the relevance filter.
//!
//! All matching is case-insensitive substring matching; entries are stored
//! as written and lower-cased when the filter is built.

/// Description terms that mark a known mismatch: the wrong article entirely,
/// or off-topic content.
pub const DESCRIPTION_EXCLUSION_TERMS: &[&str] = &[
    "spectroscopy",
    "TrES-3b",
    "14 Andromedae b",
    "OGLE-TR-56b",
    "18 Delphini b",
    "55 Cancri d",
    "TOI-1231 b",
    "Sun-like",
    "absolute magnitude",
];

/// A description must contain at least one of these to count as on-topic.
pub const POSITIVE_MARKERS: &[&str] = &["exoplanet", "extrasolar"];

/// Image URI keywords denoting diagrams, charts, plots, and other
/// non-photographic visualizations.
pub const IMAGE_EXCLUSION_KEYWORDS: &[&str] = &[
    // Common scientific terms
    "constellation",
    "diagram",
    "chart",
    "map",
    "illustration",
    "schematic",
    "graph",
    "plot",
    "curve",
    "velocity",
    "spectrum",
    "spectroscopy",
    "radial",
    "doppler",
    "wavelength",
    "lightcurve",
    "transit",
    "phase",
    "orbit",
    "motion",
    "astrometry",
    "periodogram",
    "time-series",
    "scatter",
    "lineplot",
    "histogram",
    "data",
    "analysis",
    "detection",
    "residual",
    "contour",
    "absorption",
    "emission",
    "frequency",
    "simulation",
    "model",
    "trajectory",
    "magnitude",
    "flux",
    "intensity",
    "errorbar",
    "timescale",
    "power",
    "distribution",
    "hist",
    "logarithm",
    "cross-section",
    "radar",
    "grid",
    "waveform",
    "noise",
    "precision",
    "accuracy",
    "fit",
    "measurement",
    "correlation",
    "calibration",
    "instrument",
    "function",
    "variation",
    "trend",
    "spectra",
    "offset",
    "axis",
    "scatterplot",
    "boxplot",
    "heatmap",
    "densityplot",
    "barplot",
    "polarplot",
    "surfaceplot",
    "diagrammatic",
    "visualization",
    "timeline",
    "fourier",
    "fft",
    "kinematics",
    "dynamics",
    "signal",
    "resonance",
    "phaseplot",
    "bode",
    "nyquist",
    "gain",
    "impulse",
    "stepresponse",
    // Visualization and analysis
    "wave",
    "gridlines",
    "contourplot",
    "matrix",
    "transformation",
    "vector",
    "field",
    "gradient",
    "isosurface",
    "topology",
    "morphology",
    "scattergram",
    "trendline",
    "deviation",
    "outlier",
    "confidence",
    "regression",
    "fitline",
    // Physics and astronomy
    "redshift",
    "blueshift",
    "luminosity",
    "brightness",
    "stellar",
    "orbital",
    "kinetic",
    "potential",
    "gravitational",
    "acceleration",
    "astrophysical",
    "cosmology",
    "radiation",
    "fluxdensity",
    "parallax",
    // Mathematics
    "derivative",
    "integral",
    "functionplot",
    "parametric",
    "polar",
    "cartesian",
    "complexplane",
    "vectorfield",
    "gradientfield",
    "equationplot",
    "matrixplot",
    "tensor",
    "eigenvalue",
    "eigenvector",
    "laplacian",
    "divergence",
    "curl",
    // Generic plot furniture
    "x-axis",
    "y-axis",
    "z-axis",
    "legend",
    "label",
    "scale",
    "ticks",
    "gridline",
    "errorbars",
    "datapoint",
    "dataset",
    "fitcurve",
    "trendcurve",
    "overlay",
    // File types and known-bad file names
    "svg",
    "diagram.jpg",
    "graph.png",
    "plot.jpg",
    "spectrum.png",
    "curve.png",
    "velocitygraph",
    "datagraph",
    "spectralplot",
    "motiondiagram",
    "timediagram",
    "orbitaldiagram",
    "analysischart",
];
