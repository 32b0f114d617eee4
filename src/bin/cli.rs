#![cfg(not(tarpaulin_include))]

use log::warn;
use std::env;
use std::process::ExitCode;

use timetable::{ImportMode, Timetable, TimetableConfig, loader};

fn usage(program: &str) {
    eprintln!("Usage: {} <conflicts|teachers|check> <file.csv|file.xlsx>", program);
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        usage(&args[0]);
        return ExitCode::from(2);
    }
    let (command, file) = (args[1].as_str(), args[2].as_str());
    if !matches!(command, "conflicts" | "teachers" | "check") {
        usage(&args[0]);
        return ExitCode::from(2);
    }

    let config = match TimetableConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    let records = match loader::read_records(file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let mut timetable = Timetable::from_config(&config);
    let report = timetable.import(records, ImportMode::Replace);
    for (row, reason) in &report.skipped {
        warn!("row {} skipped: {}", row, reason);
    }

    match command {
        "conflicts" => {
            for conflict in timetable.conflicts() {
                let keys: Vec<String> = conflict.keys().iter().map(|k| k.to_string()).collect();
                println!(
                    "{:?} conflict at {} {}: {} [{}]",
                    conflict.kind,
                    conflict.day,
                    conflict.time,
                    conflict.value,
                    keys.join(", ")
                );
            }
            ExitCode::SUCCESS
        }
        "teachers" => {
            for teacher in timetable.teachers() {
                println!("{}", teacher);
            }
            ExitCode::SUCCESS
        }
        _ => {
            let count = timetable.conflict_count();
            println!(
                "{} entries, {} groups, {} teachers, {} rows skipped, {} conflicts",
                timetable.len(),
                timetable.groups().len(),
                timetable.teachers().len(),
                report.skipped.len(),
                count
            );
            if count > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}
