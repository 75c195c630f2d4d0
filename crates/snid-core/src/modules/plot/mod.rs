//! SVG overlay of the corrected input spectrum against one or more
//! corrected model spectra, one vertical offset per model curve.

use crate::domain::{SnidError, SnidResult};
use crate::modules::query::{SnidReader, SortMetric};
use crate::modules::report::SpectrumTable;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct PlotOptions {
    pub size: (u32, u32),
    /// Vertical offset applied per model curve.
    pub offset_coef: f64,
    /// Plot the flux-corrected view rather than the stored raw columns.
    pub fluxcorr: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            size: (700, 400),
            offset_coef: 1.0,
            fluxcorr: true,
        }
    }
}

const DATA_COLOR: RGBColor = RGBColor(178, 178, 178);
const MODEL_COLORS: [RGBColor; 6] = [
    RGBColor(200, 0, 100),
    RGBColor(30, 144, 255),
    RGBColor(60, 179, 113),
    RGBColor(255, 140, 0),
    RGBColor(148, 0, 211),
    RGBColor(139, 69, 19),
];

/// Render the input spectrum overlaid with the given model ordinals.
pub fn plot_models(
    reader: &SnidReader,
    ordinals: &[u32],
    output: &Path,
    options: &PlotOptions,
) -> SnidResult<()> {
    let data = reader.get_inputdata(options.fluxcorr).ok_or_else(|| {
        SnidError::usage("INPUT.PLOT_DATA", "store has no 'data' section to plot")
    })?;

    let mut curves = Vec::new();
    for &ordinal in ordinals {
        let model = reader.get_modeldata(ordinal, options.fluxcorr).ok_or_else(|| {
            SnidError::usage(
                "INPUT.PLOT_MODEL",
                format!("no stored model spectrum for match no. {ordinal}"),
            )
        })?;
        let label = reader
            .get_model_label(ordinal, true)
            .unwrap_or_else(|| format!("model {ordinal}"));
        curves.push((ordinal, model, label));
    }
    if curves.is_empty() {
        return Err(SnidError::usage(
            "INPUT.PLOT_MODEL",
            "at least one model ordinal is required",
        ));
    }

    let (x_range, y_range) = plot_bounds(&data, &curves, options.offset_coef);

    let root = SVGBackend::new(output, options.size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_desc("Wavelength [Å]")
        .x_label_formatter(&|value| format!("{value:.0}"))
        .draw()
        .map_err(plot_error)?;

    for (index, (ordinal, model, label)) in curves.iter().enumerate() {
        let offset = options.offset_coef * index as f64;
        let color = MODEL_COLORS[index % MODEL_COLORS.len()];

        let data_series = chart
            .draw_series(LineSeries::new(
                data.rows
                    .iter()
                    .map(|row| (row.wavelength, row.flux - offset)),
                &DATA_COLOR,
            ))
            .map_err(plot_error)?;
        if index == 0 {
            data_series.label("snid-format data").legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &DATA_COLOR)
            });
        }

        chart
            .draw_series(LineSeries::new(
                model
                    .rows
                    .iter()
                    .map(|row| (row.wavelength, row.flux - offset)),
                &color,
            ))
            .map_err(plot_error)?
            .label(format!("{ordinal}: {label}"))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));

        if let Some(first) = model.rows.first() {
            let annotation = reader
                .get_model_label(*ordinal, true)
                .unwrap_or_else(|| format!("model {ordinal}"));
            chart
                .draw_series(std::iter::once(Text::new(
                    annotation,
                    (first.wavelength - 50.0, first.flux - offset),
                    ("sans-serif", 11).into_font().color(&color),
                )))
                .map_err(plot_error)?;
        }
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 11))
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)
}

/// Render the top best matches that have a stored model spectrum.
pub fn plot_bestmatches(
    reader: &SnidReader,
    nbest: Option<usize>,
    output: &Path,
    options: &PlotOptions,
) -> SnidResult<()> {
    let mut best = reader.get_bestmatches(SortMetric::Rlap).rows;
    if let Some(limit) = nbest {
        best.truncate(limit);
    }

    let nmodels = reader.nmodels() as u32;
    let ordinals: Vec<u32> = best
        .iter()
        .map(|row| row.ordinal)
        .filter(|ordinal| *ordinal < nmodels)
        .collect();
    if ordinals.is_empty() {
        return Err(SnidError::usage(
            "INPUT.PLOT_MODEL",
            "no best matches with stored model spectra to plot",
        ));
    }

    plot_models(reader, &ordinals, output, options)
}

type Curves = [(u32, SpectrumTable, String)];

fn plot_bounds(data: &SpectrumTable, curves: &Curves, offset_coef: f64) -> ((f64, f64), (f64, f64)) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for (index, (_, model, _)) in curves.iter().enumerate() {
        let offset = offset_coef * index as f64;
        for row in data.rows.iter().chain(model.rows.iter()) {
            x_min = x_min.min(row.wavelength);
            x_max = x_max.max(row.wavelength);
            y_min = y_min.min(row.flux - offset);
            y_max = y_max.max(row.flux - offset);
        }
    }

    if !x_min.is_finite() || !x_max.is_finite() {
        x_min = 0.0;
        x_max = 1.0;
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }

    let x_pad = ((x_max - x_min) * 0.05).max(1.0);
    let y_pad = ((y_max - y_min) * 0.08).max(0.1);
    // Extra room on the left for the per-curve annotation text.
    let left_pad = (3.0 * x_pad).max(80.0);
    ((x_min - left_pad, x_max + x_pad), (y_min - y_pad, y_max + y_pad))
}

fn plot_error(source: impl Display) -> SnidError {
    SnidError::io_system("IO.PLOT_RENDER", format!("plot rendering failed: {source}"))
}

#[cfg(test)]
mod tests {
    use super::{plot_bestmatches, plot_models, PlotOptions};
    use crate::modules::query::SnidReader;
    use crate::modules::report::{MatchRow, MatchTable, ResultBundle, SpectrumTable};
    use tempfile::TempDir;

    fn sample_reader() -> SnidReader {
        let mut bundle = ResultBundle {
            data: SpectrumTable::from_pairs([
                (4_000.0, 4_100.0),
                (4_010.0, 4_300.0),
                (4_020.0, 4_250.0),
            ]),
            ..ResultBundle::default()
        };
        bundle.models.insert(
            1,
            SpectrumTable::from_pairs([(4_000.0, 4_050.0), (4_010.0, 4_200.0), (4_020.0, 4_150.0)]),
        );
        bundle.models.insert(
            2,
            SpectrumTable::from_pairs([(4_000.0, 3_900.0), (4_010.0, 4_000.0), (4_020.0, 3_950.0)]),
        );
        bundle.models.insert(
            3,
            SpectrumTable::from_pairs([(4_000.0, 3_800.0), (4_010.0, 3_900.0), (4_020.0, 3_850.0)]),
        );
        bundle.results = MatchTable {
            rows: vec![
                MatchRow {
                    ordinal: 1,
                    sn: "SN2002er".to_string(),
                    sn_type: "Ia".to_string(),
                    grade: String::new(),
                    lap: 0.9,
                    rlap: 15.2,
                    z: 0.05,
                    z_err: 0.001,
                    age: 3.0,
                    age_flag: false,
                },
                MatchRow {
                    ordinal: 2,
                    sn: "SN1999em".to_string(),
                    sn_type: "IIP".to_string(),
                    grade: String::new(),
                    lap: 0.8,
                    rlap: 7.4,
                    z: 0.09,
                    z_err: 0.004,
                    age: -1.5,
                    age_flag: false,
                },
            ],
        };
        SnidReader::from_bundle(bundle)
    }

    #[test]
    fn overlay_plot_writes_an_svg_document() {
        let temp = TempDir::new().expect("tempdir should be created");
        let output = temp.path().join("overlay.svg");

        plot_models(&sample_reader(), &[1, 2], &output, &PlotOptions::default())
            .expect("plot should render");

        let rendered = std::fs::read_to_string(&output).expect("svg should be readable");
        assert!(rendered.contains("<svg"));
        assert!(rendered.contains("Wavelength"));
    }

    #[test]
    fn unknown_model_ordinal_is_a_usage_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let output = temp.path().join("overlay.svg");

        let error = plot_models(&sample_reader(), &[9], &output, &PlotOptions::default())
            .expect_err("missing model should fail");
        assert_eq!(error.placeholder(), "INPUT.PLOT_MODEL");
    }

    #[test]
    fn bestmatch_plot_is_limited_to_ordinals_with_stored_models() {
        let temp = TempDir::new().expect("tempdir should be created");
        let output = temp.path().join("best.svg");

        // Three stored models; ordinals 1 and 2 qualify under the
        // `ordinal < nmodels` convention and both have spectra.
        plot_bestmatches(&sample_reader(), Some(5), &output, &PlotOptions::default())
            .expect("best-match plot should render");
        assert!(output.exists());
    }
}
