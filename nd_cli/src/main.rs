//! CLI demo for lazy tensor expressions.
//!
//! Builds a broadcast expression, shows that nothing is computed until it is
//! read, then evaluates it and runs an in-place compound assignment.

use std::cell::Cell;

use clap::Parser;
use log::info;

use nd_backend_cpu::CpuTensor;
use nd_tensor::prelude::*;

#[derive(Parser)]
#[command(name = "nd")]
#[command(about = "Lazy strided tensor expressions - broadcasting demo")]
#[command(version)]
struct Cli {
    /// Rows of the column operand
    #[arg(short, long, default_value_t = 3)]
    rows: usize,

    /// Columns of the row operand
    #[arg(short, long, default_value_t = 4)]
    cols: usize,

    /// Backend traversal used for evaluation and assignment
    #[arg(short, long, default_value = "auto")]
    backend: BackendArg,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum BackendArg {
    Auto,
    Walker,
}

impl From<BackendArg> for Traversal {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Traversal::Auto,
            BackendArg::Walker => Traversal::Walker,
        }
    }
}

fn print_matrix(name: &str, t: &CpuTensor<f64>) {
    println!("{name} {}:", t.shape());
    let cols = t.shape().dims().last().copied().unwrap_or(1).max(1);
    for row in t.to_vec().chunks(cols) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:8.2}")).collect();
        println!("  [{}]", cells.join(" "));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let traversal = Traversal::from(cli.backend);

    println!("=== Lazy Tensor Expression Demo ===\n");

    let col = CpuTensor::from_vec(
        (0..cli.rows).map(|i| i as f64 + 1.0).collect(),
        Shape::new(vec![cli.rows, 1]),
    )?;
    let row = CpuTensor::from_vec(
        (0..cli.cols).map(|j| (j as f64 + 1.0) * 10.0).collect(),
        Shape::new(vec![1, cli.cols]),
    )?;
    print_matrix("column", &col);
    print_matrix("row", &row);

    // Build: (col * row + 0.5) with a counting function
    let calls = Cell::new(0usize);
    let product = |x: f64, y: f64| {
        calls.set(calls.get() + 1);
        x * y
    };
    let expr = n_operator(functor::Add, (&n_operator(product, (&col, &row))?, 0.5))?;

    println!("\nExpression: column * row + 0.5");
    println!("Broadcast shape: {}", expr.shape());
    println!("Function calls after construction: {}", calls.get());

    let result = CpuTensor::from_expr_with(&expr, traversal);
    println!("Function calls after evaluation ({traversal:?}): {}\n", calls.get());
    print_matrix("result", &result);

    // In-place compound assignment: result -= row
    let mut dest = result.clone();
    a_operator_with(traversal, functor::SubAssign, &mut dest, &row)?;
    println!();
    print_matrix("result - row", &dest);
    println!("Buffer copied on write: {}", !dest.shares_buffer(&result));

    // Writes through a mutable view land in the viewed tensor
    let mut first_row = dest.slice_axis_mut(0, 0, 1, 1)?;
    a_operator_with(traversal, functor::Assign, &mut first_row, 0.0f64)?;
    println!();
    print_matrix("first row cleared", &dest);

    // Incompatible shapes are rejected before any element is read
    println!("\n=== Error Handling ===\n");
    let wrong = CpuTensor::<f64>::zeros(&Shape::new(vec![cli.rows + 1, cli.cols + 1]));
    match n_operator(functor::Add, (&result, &wrong)) {
        Ok(e) => println!("unexpectedly built an expression of shape {}", e.shape()),
        Err(e) => println!("n_operator: {e}"),
    }
    match n_operator(functor::Add, (1.0, 2.0)) {
        Ok(_) => println!("unexpectedly built an all-scalar expression"),
        Err(e) => println!("n_operator: {e}"),
    }

    info!("demo finished with {} function calls", calls.get());
    Ok(())
}
