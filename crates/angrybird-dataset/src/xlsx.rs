use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

use crate::count::{count_from_f64, parse_count};
use crate::date::{from_excel_serial, ISO_FORMAT};
use crate::schema::{Column, SHEET_NAME};
use crate::{collect_hashtags, Error, Result, VideoRecord};

fn build_workbook(records: &[VideoRecord]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let count = Format::new().set_num_format("#,##0");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for col in Column::ALL {
        sheet.write_string_with_format(0, col.index(), col.header(), &header)?;
        sheet.set_column_width(col.index(), col.width())?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (i, record) in records.iter().enumerate() {
        let row = i as u32 + 1;
        for col in Column::ALL {
            if col.is_count() {
                let value = match col {
                    Column::Likes => record.likes,
                    Column::Comments => record.comments,
                    Column::Favorites => record.favorites,
                    _ => record.shares,
                };
                sheet.write_number_with_format(row, col.index(), value as f64, &count)?;
                continue;
            }
            let text = match col {
                Column::Id => record.id.clone(),
                Column::Uploader => record.author.clone(),
                Column::UploadDate => record.upload_date_text(),
                Column::Description => record.description.clone(),
                Column::Hashtags => record.hashtags.join(" "),
                _ => record.music.clone(),
            };
            if !text.is_empty() {
                sheet.write_string(row, col.index(), &text)?;
            }
        }
    }

    Ok(workbook)
}

/// Write `records` to `path`, replacing any existing file.
pub fn write_workbook(path: impl AsRef<Path>, records: &[VideoRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    build_workbook(records)?.save(path)?;
    Ok(())
}

/// Serialize `records` to xlsx bytes (used for downloads).
pub fn write_to_buffer(records: &[VideoRecord]) -> Result<Vec<u8>> {
    Ok(build_workbook(records)?.save_to_buffer()?)
}

/// Load every record from the file at `path`.
pub fn read_workbook(path: impl AsRef<Path>) -> Result<Vec<VideoRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let workbook: Xlsx<_> = open_workbook(path)?;
    records_from(workbook)
}

/// Load every record from an in-memory or otherwise seekable xlsx source.
pub fn read_workbook_from<R: Read + Seek>(reader: R) -> Result<Vec<VideoRecord>> {
    records_from(Xlsx::new(reader)?)
}

fn records_from<R: Read + Seek>(mut workbook: Xlsx<R>) -> Result<Vec<VideoRecord>> {
    let range = match workbook.worksheet_range(SHEET_NAME) {
        Ok(range) => range,
        Err(_) => workbook.worksheet_range_at(0).ok_or(Error::EmptyWorkbook)??,
    };
    records_from_range(&range)
}

fn records_from_range(range: &Range<Data>) -> Result<Vec<VideoRecord>> {
    let mut rows = range.rows();
    let positions: HashMap<Column, usize> = rows
        .next()
        .map(|header| {
            header
                .iter()
                .enumerate()
                .filter_map(|(i, cell)| Column::from_header(&cell.to_string()).map(|c| (c, i)))
                .collect()
        })
        .unwrap_or_default();

    if let Some(missing) = Column::ALL
        .into_iter()
        .find(|c| c.required() && !positions.contains_key(c))
    {
        return Err(Error::MissingColumn(missing.header()));
    }

    let mut records = Vec::new();
    for (n, row) in rows.enumerate() {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let cell = |col: Column| positions.get(&col).and_then(|&i| row.get(i));
        let text = |col: Column| cell(col).map(cell_text).unwrap_or_default();
        let count = |col: Column| cell(col).map(cell_count).unwrap_or(0);

        let description = text(Column::Description);
        let hashtags = if positions.contains_key(&Column::Hashtags) {
            text(Column::Hashtags)
                .split_whitespace()
                .map(str::to_string)
                .collect()
        } else {
            collect_hashtags(&description, [])
        };
        let id = match text(Column::Id) {
            id if id.is_empty() => format!("row-{}", n + 1),
            id => id,
        };

        records.push(VideoRecord {
            id,
            author: text(Column::Uploader),
            description,
            hashtags,
            upload_date: cell(Column::UploadDate).and_then(cell_date),
            likes: count(Column::Likes),
            comments: count(Column::Comments),
            favorites: count(Column::Favorites),
            shares: count(Column::Shares),
            music: text(Column::Music),
        });
    }
    Ok(records)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn cell_count(cell: &Data) -> u64 {
    match cell {
        Data::Int(i) => (*i).max(0) as u64,
        Data::Float(f) => count_from_f64(*f),
        Data::String(s) => parse_count(s),
        _ => 0,
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), ISO_FORMAT).ok()
        }
        Data::Float(f) => from_excel_serial(*f),
        Data::Int(i) => from_excel_serial(*i as f64),
        Data::DateTime(dt) => from_excel_serial(dt.as_f64()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Vec<VideoRecord> {
        let mut a = VideoRecord::new("7301", "shopqueen");
        a.description = "Restock! link in bio #shop".into();
        a.hashtags = vec!["#shop".into()];
        a.upload_date = NaiveDate::from_ymd_opt(2024, 2, 15);
        a.likes = 12_300;
        a.comments = 41;
        a.favorites = 900;
        a.shares = 7;
        a.music = "original sound - shopqueen".into();

        let b = VideoRecord::new("7302", "dancer");
        vec![a, b]
    }

    #[test]
    fn test_buffer_round_trip_keeps_types() {
        let bytes = write_to_buffer(&sample()).unwrap();
        let back = read_workbook_from(Cursor::new(bytes)).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let bytes = write_to_buffer(&[]).unwrap();
        let back = read_workbook_from(Cursor::new(bytes)).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let path = std::env::temp_dir().join("angrybird-dataset-does-not-exist.xlsx");
        let err = read_workbook(&path).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_write_overwrites_previous_file() {
        let dir = std::env::temp_dir().join(format!("angrybird-dataset-{}", std::process::id()));
        let path = dir.join("videos.xlsx");
        write_workbook(&path, &sample()).unwrap();
        write_workbook(&path, &sample()[..1]).unwrap();
        let back = read_workbook(&path).unwrap();
        assert_eq!(back.len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_foreign_sheet_without_id_column() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (i, h) in ["Uploader", "Description", "Likes", "Comments", "Shares"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, i as u16, *h).unwrap();
        }
        sheet.write_string(1, 0, "a").unwrap();
        sheet.write_string(1, 1, "nice #Deal").unwrap();
        sheet.write_string(1, 2, "1.5K").unwrap();
        sheet.write_number(1, 3, -3.0).unwrap();
        sheet.write_number(1, 4, 2.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let back = read_workbook_from(Cursor::new(bytes)).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, "row-1");
        assert_eq!(back[0].likes, 1500);
        assert_eq!(back[0].comments, 0);
        assert_eq!(back[0].shares, 2);
        assert_eq!(back[0].hashtags, vec!["#deal"]);
    }

    #[test]
    fn test_huge_date_serial_reads_as_unknown() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (i, h) in ["Uploader", "Upload Date", "Likes", "Comments", "Shares"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, i as u16, *h).unwrap();
        }
        sheet.write_string(1, 0, "a").unwrap();
        sheet.write_number(1, 1, 1e15).unwrap();
        sheet.write_number(1, 2, 5.0).unwrap();
        sheet.write_string(2, 0, "b").unwrap();
        sheet.write_number(2, 1, 45292.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let back = read_workbook_from(Cursor::new(bytes)).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].upload_date, None);
        assert_eq!(back[0].likes, 5);
        assert_eq!(back[1].upload_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_missing_required_column() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Uploader").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();
        let err = read_workbook_from(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::MissingColumn("Likes")));
    }
}
