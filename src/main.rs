use clap::Parser;
use org_mover::{org_mover_main, OrgMoverCli};
use std::process::exit;

#[tokio::main]
async fn main() {
    println!(concat!(
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION")
    ));
    let _ = dotenv::dotenv();
    let args = OrgMoverCli::parse();
    env_logger::builder()
        .filter_level(args.log_level())
        .format_target(false)
        .format_timestamp(None)
        .init();
    match org_mover_main(args).await {
        Ok(_) => {
            exit(0);
        }
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };
}
