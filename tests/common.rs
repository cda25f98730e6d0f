/// Shared helpers: synthetic SMNI long-format CSVs.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const HEADER: &str =
    ",trial number,sensor position,sample num,sensor value,subject identifier,matching condition,channel,name,time";

/// One channel of one trial.
pub struct Channel<'a> {
    pub name: &'a str,
    pub values: Vec<f32>,
}

#[allow(unused)]
pub fn constant(name: &str, value: f32, n: usize) -> Channel<'_> {
    Channel { name, values: vec![value; n] }
}

#[allow(unused)]
pub fn sine(name: &str, freq: f32, amp: f32, n: usize) -> Channel<'_> {
    let values = (0..n)
        .map(|t| amp * (2.0 * std::f32::consts::PI * freq * t as f32 / 256.0).sin())
        .collect();
    Channel { name, values }
}

/// Render trials in row order; `subject` is `a` or `c`.
pub fn smni_csv(subject: &str, trials: &[(i64, Vec<Channel<'_>>)]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    let mut row = 0usize;
    for (trial, channels) in trials {
        for (ci, ch) in channels.iter().enumerate() {
            for (t, v) in ch.values.iter().enumerate() {
                writeln!(
                    out,
                    "{row},{trial},{},{t},{v},{subject},S1 obj,{ci},co2{subject}0000364,{}",
                    ch.name,
                    t as f32 / 256.0
                )
                .unwrap();
                row += 1;
            }
        }
    }
    out
}

#[allow(unused)]
pub fn write_csv(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}
