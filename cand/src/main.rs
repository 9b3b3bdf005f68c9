use std::io::Write;
use std::process;
use std::sync::Arc;

use clap::{App, AppSettings, Arg};

use cand::{RawCanDevice, Router};

/// Applies SCHED_RR with the given priority so bus traffic keeps flowing
/// when the instrument is busy. Failure is survivable; routing just runs at
/// normal priority.
fn set_realtime_priority(priority: i32) {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_RR, &param) };
    if rc != 0 {
        log::warn!(
            "failed to set realtime priority {priority}: {}",
            std::io::Error::last_os_error()
        );
    }
}

fn main() {
    let app = App::new("cand")
        .version("0.1.0")
        .about("CAN multiplexing daemon")
        .setting(AppSettings::DeriveDisplayOrder)
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .takes_value(true)
                .default_value(cand::device::DEFAULT_CAN_DEV_PATH)
                .help("Path of the CAN character device"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .help("Raise log verbosity (repeat for more)"),
        )
        .arg(
            Arg::new("priority")
                .short('p')
                .long("priority")
                .takes_value(true)
                .help("Run with SCHED_RR realtime priority"),
        );

    let matches = app.get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "cand [{}] {}", record.level(), record.args()))
        .filter(None, level)
        .init();

    if let Some(priority) = matches.value_of("priority") {
        match priority.parse::<i32>() {
            Ok(priority) => set_realtime_priority(priority),
            Err(_) => {
                eprintln!("invalid priority `{priority}`");
                process::exit(1);
            }
        }
    }

    let dev_path = matches.value_of("device").unwrap_or(cand::device::DEFAULT_CAN_DEV_PATH);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to build runtime: {err}");
            process::exit(1);
        }
    };

    let code = runtime.block_on(async {
        let device = match RawCanDevice::open(dev_path) {
            Ok(device) => Arc::new(device),
            Err(err) => {
                log::error!("cannot open CAN device {dev_path}: {err}");
                return 1;
            }
        };

        let router = match Router::new(device) {
            Ok(router) => router,
            Err(err) => {
                log::error!("cannot claim command mailbox: {err}");
                return 1;
            }
        };

        tokio::select! {
            res = router.run() => {
                if let Err(err) = res {
                    log::error!("router stopped: {err}");
                    return 1;
                }
                0
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("cand: interrupted, shutting down");
                0
            }
        }
    });

    process::exit(code);
}
