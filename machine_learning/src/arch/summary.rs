use std::fmt::{self, Display};

const NAME_WIDTH: usize = 28;
const SHAPE_WIDTH: usize = 26;
const PARAMS_WIDTH: usize = 12;

/// A single layer of a `Summary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub name: String,
    /// The shape of a single output sample, without the batch axis.
    pub output_shape: Vec<usize>,
    pub params: usize,
}

/// A layer by layer description of a model, rendered as a table by its `Display` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    input: Vec<usize>,
    rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn new(input: Vec<usize>, rows: Vec<SummaryRow>) -> Self {
        Self { input, rows }
    }

    pub fn input(&self) -> &[usize] {
        &self.input
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn total_params(&self) -> usize {
        self.rows.iter().map(|row| row.params).sum()
    }

    /// The shape of a single output sample of the whole model.
    pub fn output_shape(&self) -> &[usize] {
        self.rows
            .last()
            .map_or(&self.input, |row| &row.output_shape)
    }
}

/// Formats a shape with a leading free batch axis, `(None, 32, 16, 16)`.
fn batched(shape: &[usize]) -> String {
    let dims: Vec<_> = std::iter::once("None".to_string())
        .chain(shape.iter().map(usize::to_string))
        .collect();

    format!("({})", dims.join(", "))
}

/// Formats a count with comma separated thousands.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

impl Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = NAME_WIDTH + SHAPE_WIDTH + PARAMS_WIDTH;

        writeln!(f, "Input: {}", batched(&self.input))?;
        writeln!(f, "{}", "_".repeat(width))?;
        writeln!(
            f,
            "{:<NAME_WIDTH$}{:<SHAPE_WIDTH$}{:>PARAMS_WIDTH$}",
            "Layer (type)", "Output Shape", "Param #"
        )?;
        writeln!(f, "{}", "=".repeat(width))?;

        for row in &self.rows {
            writeln!(
                f,
                "{:<NAME_WIDTH$}{:<SHAPE_WIDTH$}{:>PARAMS_WIDTH$}",
                row.name,
                batched(&row.output_shape),
                thousands(row.params)
            )?;
        }

        writeln!(f, "{}", "=".repeat(width))?;
        write!(f, "Total params: {}", thousands(self.total_params()))
    }
}
