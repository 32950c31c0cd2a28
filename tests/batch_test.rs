use anyhow::Result;
use chrono::NaiveDate;
use icstrim::batch::{BatchPaths, trim_directory};
use icstrim::{TrimOptions, TrimWindow};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

const KEPT: &str = concat!(
    "BEGIN:VCALENDAR\r\n",
    "BEGIN:VEVENT\r\n",
    "DTSTART:20240110T100000Z\r\n",
    "DTEND:20240110T110000Z\r\n",
    "SUMMARY:kept\r\n",
    "END:VEVENT\r\n",
    "END:VCALENDAR\r\n"
);
const DROPPED_EVENT: &str = concat!(
    "BEGIN:VEVENT\r\n",
    "DTSTART:20230110T100000Z\r\n",
    "DTEND:20230110T110000Z\r\n",
    "SUMMARY:dropped\r\n",
    "END:VEVENT\r\n"
);

fn january() -> TrimWindow {
    TrimWindow::from_dates(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_trim_directory_writes_each_file() -> Result<()> {
    let root = tempdir()?;
    let input_dir = root.path().join("in");
    let output_dir = root.path().join("out").join("nested");
    fs::create_dir(&input_dir)?;

    let with_dropped = KEPT.replace(
        "END:VCALENDAR\r\n",
        &format!("{}END:VCALENDAR\r\n", DROPPED_EVENT),
    );
    fs::write(input_dir.join("work.ics"), &with_dropped)?;
    fs::write(input_dir.join("home.ics"), KEPT)?;
    fs::write(input_dir.join("readme.txt"), "not a calendar")?;

    let paths = BatchPaths {
        input_dir,
        output_dir: output_dir.clone(),
        extension: "ics".to_string(),
    };
    let report = trim_directory(&paths, january(), TrimOptions::default()).await?;

    assert!(report.is_success());
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.stats.kept, 2);
    assert_eq!(report.stats.removed, 1);
    assert_eq!(fs::read_to_string(output_dir.join("work.ics"))?, KEPT);
    assert_eq!(fs::read_to_string(output_dir.join("home.ics"))?, KEPT);
    assert!(!output_dir.join("readme.txt").exists());
    Ok(())
}

#[tokio::test]
async fn test_malformed_file_is_skipped() -> Result<()> {
    let root = tempdir()?;
    let input_dir = root.path().join("in");
    let output_dir = root.path().join("out");
    fs::create_dir(&input_dir)?;

    fs::write(input_dir.join("good.ics"), KEPT)?;
    fs::write(
        input_dir.join("broken.ics"),
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:not-a-date\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
    )?;

    let paths = BatchPaths {
        input_dir: input_dir.clone(),
        output_dir: output_dir.clone(),
        extension: "ics".to_string(),
    };
    let report = trim_directory(&paths, january(), TrimOptions::default()).await?;

    assert!(!report.is_success());
    assert_eq!(report.written, vec![output_dir.join("good.ics")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, input_dir.join("broken.ics"));
    let reason = format!("{:#}", report.failed[0].1);
    assert!(reason.contains("Malformed timestamp 'not-a-date'"));
    assert!(!output_dir.join("broken.ics").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_input_dir_is_error() {
    let root = tempdir().unwrap();
    let paths = BatchPaths {
        input_dir: root.path().join("absent"),
        output_dir: root.path().join("out"),
        extension: "ics".to_string(),
    };
    let result = trim_directory(&paths, january(), TrimOptions::default()).await;
    assert!(result.is_err());
}
