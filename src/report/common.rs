//! Date and filename helpers shared by report assembly.

use chrono::{Datelike, Local, NaiveDate};

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Long Indonesian date, e.g. "19 Oktober 2026".
pub fn indonesian_date(date: NaiveDate) -> String {
    let month = MONTHS[(date.month0() as usize).min(MONTHS.len() - 1)];
    format!("{} {} {}", date.day(), month, date.year())
}

/// Today's date in the long Indonesian form.
pub fn format_indonesian_date() -> String {
    indonesian_date(Local::now().date_naive())
}

/// `{prefix}_{Subject_Name}.pdf`; whitespace runs become `_`, quotes and
/// control characters are dropped.
pub fn report_filename(prefix: &str, subject_name: &str) -> String {
    let subject = subject_name
        .split_whitespace()
        .map(|part| sanitize_filename::sanitize(part.replace('\'', "")))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if subject.is_empty() {
        format!("{}.pdf", prefix)
    } else {
        format!("{}_{}.pdf", prefix, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indonesian_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(indonesian_date(date), "19 Oktober 2026");

        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(indonesian_date(date), "5 Januari 2025");
    }

    #[test]
    fn test_report_filename_replaces_whitespace() {
        assert_eq!(
            report_filename("Sertifikat", "Muhammad  Al Fatih"),
            "Sertifikat_Muhammad_Al_Fatih.pdf"
        );
        assert_eq!(
            report_filename("Laporan_Perkembangan", " Siti\t\"Aisyah\" "),
            "Laporan_Perkembangan_Siti_Aisyah.pdf"
        );
        assert_eq!(report_filename("Sertifikat", "   "), "Sertifikat.pdf");
    }
}
