//! Result output formatting.

use crate::OutputFormat;
use anyhow::Result;
use lib_dsp::conversion::ConverterSpec;
use lib_dsp::convolution::{Convolution, CorrelationPeak};
use lib_dsp::periodogram::Periodogram;
use lib_types::curve::Curve;
use std::io::Write;

/// Write a rendered curve.
pub fn write_curve<W: Write>(w: &mut W, curve: &Curve, format: OutputFormat) -> Result<()> {
    let (xl, yl) = (curve.domain.label(), curve.value.label());
    match format {
        OutputFormat::Text => {
            writeln!(w, "{:>16} {:>16}", xl, yl)?;
            for (x, y) in curve.points() {
                writeln!(w, "{:>16.8e} {:>16.8e}", x, y)?;
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(curve)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "{},{}", xl, yl)?;
            for (x, y) in curve.points() {
                writeln!(w, "{},{}", x, y)?;
            }
        }
    }
    Ok(())
}

/// Write a plain sequence against its sample index.
pub fn write_sequence<W: Write>(w: &mut W, name: &str, values: &[f64], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for (i, v) in values.iter().enumerate() {
                writeln!(w, "{:>8} {:>16.8e}", i, v)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({ name: values });
            writeln!(w, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "n,{}", name)?;
            for (i, v) in values.iter().enumerate() {
                writeln!(w, "{},{}", i, v)?;
            }
        }
    }
    Ok(())
}

/// Write a filtered sequence, flagging samples outside the full-immersion range.
pub fn write_convolution<W: Write>(w: &mut W, conv: &Convolution, format: OutputFormat) -> Result<()> {
    let range = conv.full_range().map(|r| (*r.start(), *r.end()));
    match format {
        OutputFormat::Text => {
            match range {
                Some((i1, i2)) => writeln!(w, "# reliable samples: [{}, {}]", i1, i2)?,
                None => writeln!(w, "# kernel longer than input; no fully formed samples")?,
            }
            for (i, v) in conv.samples.iter().enumerate() {
                let mark = if conv.is_reliable(i) { ' ' } else { '*' };
                writeln!(w, "{:>8} {:>16.8e} {}", i, v, mark)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "samples": conv.samples,
                "i1": range.map(|r| r.0),
                "i2": range.map(|r| r.1),
                "kernel_len": conv.kernel_len,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "n,value,reliable")?;
            for (i, v) in conv.samples.iter().enumerate() {
                writeln!(w, "{},{},{}", i, v, conv.is_reliable(i))?;
            }
        }
    }
    Ok(())
}

/// Write ADC codes together with the converter characteristics.
pub fn write_codes<W: Write>(w: &mut W, spec: &ConverterSpec, codes: &[i64], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "{}", spec)?;
            writeln!(w)?;
            for (i, c) in codes.iter().enumerate() {
                writeln!(w, "{:>8} {:>12}", i, c)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "nbits": spec.nbits,
                "levels": spec.levels,
                "vref": spec.vref.0,
                "vfs": spec.vfs.0,
                "lsb": spec.lsb.0,
                "dynamic_range_db": spec.dynamic_range_db,
                "pedestal": spec.pedestal,
                "codes": codes,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "n,code")?;
            for (i, c) in codes.iter().enumerate() {
                writeln!(w, "{},{}", i, c)?;
            }
        }
    }
    Ok(())
}

/// Write a correlation peak.
pub fn write_peak<W: Write>(w: &mut W, peak: &CorrelationPeak, seconds: Option<f64>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "Peak index: {}", peak.index)?;
            writeln!(w, "Lag:        {} samples", peak.lag)?;
            if let Some(s) = seconds {
                writeln!(w, "Lag:        {:.6e} s", s)?;
            }
            writeln!(w, "Value:      {:.6}", peak.value)?;
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "index": peak.index,
                "lag": peak.lag,
                "lag_seconds": seconds,
                "value": peak.value,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "index,lag,lag_seconds,value")?;
            let s = seconds.map(|s| s.to_string()).unwrap_or_default();
            writeln!(w, "{},{},{},{}", peak.index, peak.lag, s, peak.value)?;
        }
    }
    Ok(())
}

/// Write a periodogram with its fit coefficients.
pub fn write_periodogram<W: Write>(w: &mut W, pg: &Periodogram, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if let Some(peak) = pg.peak() {
                writeln!(
                    w,
                    "# peak: f = {:.8e} per {:?} (period {:.6e}), power {:.6}",
                    peak.frequency,
                    pg.unit,
                    1.0 / peak.frequency,
                    peak.power
                )?;
            }
            writeln!(w, "{:>16} {:>12} {:>12} {:>12} {:>12}", "f", "power", "a", "b", "c")?;
            for p in &pg.points {
                writeln!(
                    w,
                    "{:>16.8e} {:>12.6} {:>12.5e} {:>12.5e} {:>12.5e}",
                    p.frequency, p.power, p.a, p.b, p.c
                )?;
            }
        }
        OutputFormat::Json => {
            let points: Vec<_> = pg
                .points
                .iter()
                .map(|p| serde_json::json!({ "f": p.frequency, "power": p.power, "a": p.a, "b": p.b, "c": p.c }))
                .collect();
            let json = serde_json::json!({
                "unit": format!("{:?}", pg.unit),
                "peak_frequency": pg.peak().map(|p| p.frequency),
                "points": points,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "f,power,a,b,c")?;
            for p in &pg.points {
                writeln!(w, "{},{},{},{},{}", p.frequency, p.power, p.a, p.b, p.c)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_dsp::convolution::ConvolveShift;
    use lib_types::selector::{AxisDomain, ValueKind};

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_curve_csv_and_json() {
        let mut curve = Curve::new(AxisDomain::Hertz, ValueKind::Decibel);
        curve.push(0.0, -3.0);
        curve.push(10.0, -6.0);

        let csv = render(|w| write_curve(w, &curve, OutputFormat::Csv));
        assert_eq!(csv, "Hz,dB\n0,-3\n10,-6\n");

        let json = render(|w| write_curve(w, &curve, OutputFormat::Json));
        let back: Curve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }

    #[test]
    fn test_convolution_flags_partial_samples() {
        let conv = Convolution {
            samples: vec![0.5, 1.0, 1.0, 0.5],
            i1: 1,
            i2: 2,
            shift: ConvolveShift::Truncated,
            kernel_len: 3,
        };
        let csv = render(|w| write_convolution(w, &conv, OutputFormat::Csv));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "0,0.5,false");
        assert_eq!(lines[2], "1,1,true");

        let text = render(|w| write_convolution(w, &conv, OutputFormat::Text));
        assert!(text.starts_with("# reliable samples: [1, 2]"));
    }

    #[test]
    fn test_sequence_json() {
        let json = render(|w| write_sequence(w, "dac", &[0.25, 0.5], OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dac"][1], 0.5);
    }
}
