//! coalesce-demo - Feed tiny chunks through a coalescing buffer and print
//! what comes out the other side.

use std::thread;

use anyhow::Result;
use clap::Parser;
use coalesce_buffer::FlushBuffer;

/// Writes forty 1-byte chunks into a coalescing buffer and prints each
/// flushed chunk, e.g. `"00000" = 5 bytes`.
#[derive(Parser, Debug)]
#[command(name = "coalesce-demo")]
#[command(about = "Demonstrates write coalescing with a small flush threshold")]
struct Args {
    /// Flush threshold in bytes
    #[arg(short = 't', long, default_value_t = 5)]
    threshold: usize,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    }

    let buf = FlushBuffer::with_threshold(args.threshold);
    let writer = buf.clone();

    let producer = thread::spawn(move || -> coalesce_buffer::Result<()> {
        for digit in 0..4 {
            for _ in 0..10 {
                writer.write(digit.to_string().as_bytes())?;
            }
        }
        writer.finish()
    });

    for chunk in buf.chunks() {
        let chunk = chunk?;
        println!(
            "\"{}\" = {} bytes",
            String::from_utf8_lossy(&chunk),
            chunk.len()
        );
    }

    producer.join().expect("producer thread panicked")?;
    Ok(())
}
