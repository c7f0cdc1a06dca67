//! Workbooks generated in memory for tests.

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

/// Two-sheet workbook:
///
/// - `October`: two valid rows with typed cells (number, date, text)
/// - `Audit`: one row whose Verified cell is a boolean
pub fn transactions_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let october = workbook.add_worksheet().set_name("October").unwrap();
    write_headers(october);
    october.write_string(1, 0, "Alice").unwrap();
    october.write_number(1, 1, 123.45).unwrap();
    october
        .write_datetime_with_format(1, 2, &ExcelDateTime::from_ymd(2026, 10, 3).unwrap(), &date_format)
        .unwrap();
    october.write_string(1, 3, "Yes").unwrap();
    october.write_string(2, 0, "Bob").unwrap();
    october.write_number(2, 1, 7).unwrap();
    october
        .write_datetime_with_format(2, 2, &ExcelDateTime::from_ymd(2026, 10, 31).unwrap(), &date_format)
        .unwrap();
    october.write_string(2, 3, "No").unwrap();

    let audit = workbook.add_worksheet().set_name("Audit").unwrap();
    write_headers(audit);
    audit.write_string(1, 0, "Carol").unwrap();
    audit.write_number(1, 1, 5).unwrap();
    audit
        .write_datetime_with_format(1, 2, &ExcelDateTime::from_ymd(2026, 10, 5).unwrap(), &date_format)
        .unwrap();
    audit.write_boolean(1, 3, true).unwrap();

    workbook.save_to_buffer().unwrap()
}

fn write_headers(sheet: &mut Worksheet) {
    for (col, header) in ["Name", "Amount", "Date", "Verified"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
}
