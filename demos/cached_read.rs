//! Example: Cached reads against an in-memory device
//!
//! Run with: RUST_LOG=plc_dbcache=debug cargo run --example cached_read
//!
//! This example demonstrates:
//! - Reading typed variables in each read mode
//! - How tracked variables widen the fetched block prefix
//! - Refreshing every tracked variable of a block at once
//! - Cancelling a slow read

use plc_dbcache::{MemoryTransport, PlcReader, ReadMode, ReaderConfig, VariableAddress};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> plc_dbcache::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // =========================================================================
    // Simulated device
    // =========================================================================

    let device = MemoryTransport::new()
        .with_block(5, vec![0; 64])
        .with_latency(Duration::from_millis(20));
    device.write_value(&"DB5.DINT0".parse::<VariableAddress>()?, 1_500i32)?;
    device.write_value(&"DB5.REAL4".parse::<VariableAddress>()?, 21.5f32)?;
    device.write_value(&"DB5.DBX8.2".parse::<VariableAddress>()?, true)?;
    device.write_value(&"DB5.S10.16".parse::<VariableAddress>()?, "Line 3 / Pump A")?;

    let config = ReaderConfig::new().with_cache_validity(Duration::from_secs(2));
    let reader = PlcReader::new(device, config);
    let cancel = CancellationToken::new();

    // =========================================================================
    // Cached reads
    // =========================================================================

    println!("=== Cached Reads ===\n");

    let label: String = reader.read_value("DB5.S10.16", ReadMode::Cached, &cancel).await?;
    let speed: i32 = reader.read_value("DB5.DINT0", ReadMode::Cached, &cancel).await?;
    let temperature: f32 = reader.read_value("DB5.REAL4", ReadMode::Cached, &cancel).await?;
    let running: bool = reader.read_value("DB5.DBX8.2", ReadMode::Cached, &cancel).await?;

    println!("DB5.S10.16 = {label:?}");
    println!("DB5.DINT0  = {speed}");
    println!("DB5.REAL4  = {temperature}");
    println!("DB5.DBX8.2 = {running}");
    println!("Device requests: {}", reader.transport().read_count());
    println!("Tracked prefix of DB5: {} bytes", reader.tracker().max_offset_for(5)?);

    // =========================================================================
    // Direct and forced reads
    // =========================================================================

    println!("\n=== Direct and Forced Reads ===\n");

    reader
        .transport()
        .write_value(&"DB5.DINT0".parse::<VariableAddress>()?, 1_750i32)?;

    let cached: i32 = reader.read_value("DB5.DINT0", ReadMode::Cached, &cancel).await?;
    let direct: i32 = reader.read_value("DB5.DINT0", ReadMode::Direct, &cancel).await?;
    let forced: i32 = reader.read_value("DB5.DINT0", ReadMode::ForceRefresh, &cancel).await?;
    println!("cached = {cached}, direct = {direct}, after refresh = {forced}");

    // =========================================================================
    // All tracked values
    // =========================================================================

    println!("\n=== All Tracked Values of DB5 ===\n");

    let values = reader.refresh_all_tracked_values(5, &cancel).await?;
    let mut names: Vec<_> = values.keys().collect();
    names.sort();
    for name in names {
        println!("{name:<12} = {}", values[name]);
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    println!("\n=== Cancellation ===\n");

    let slow = CancellationToken::new();
    let canceller = slow.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        canceller.cancel();
    });

    match reader.read_value::<i32>("DB5.DINT0", ReadMode::Direct, &slow).await {
        Ok(value) => println!("read completed: {value}"),
        Err(e) => println!("read aborted: {e}"),
    }

    println!("\nTotal device requests: {}", reader.transport().read_count());
    Ok(())
}
