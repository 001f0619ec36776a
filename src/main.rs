fn main() -> anyhow::Result<()> {
    health_metrics_lib::run()
}
