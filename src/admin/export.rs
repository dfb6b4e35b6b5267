//! Data export as JSON arrays or CSV attachments

use axum::{
    Json,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::types::{MdaSummary, UserView};
use crate::error::ApiError;
use crate::model::{Mda, User};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Absent means JSON
    pub fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("json") => Ok(ExportFormat::Json),
            Some("csv") => Ok(ExportFormat::Csv),
            Some(_) => Err(ApiError::invalid("format", "format must be json or csv")),
        }
    }
}

/// An MDA together with its users
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MdaWithUsers {
    #[serde(flatten)]
    pub mda: Mda,
    pub users: Vec<User>,
}

/// RFC 4180 output; every record ends with CRLF
fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new())
}

fn write_row<I, S>(wtr: &mut csv::Writer<Vec<u8>>, fields: I) -> Result<(), ApiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    wtr.write_record(fields)
        .map_err(|e| ApiError::Internal(format!("Failed to write CSV record: {}", e)))
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ApiError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("Failed to flush CSV writer: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(e.to_string()))
}

fn time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn time_opt(dt: &Option<DateTime<Utc>>) -> String {
    dt.as_ref().map(time).unwrap_or_default()
}

fn bool_str(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

const USER_HEADER: [&str; 9] = [
    "id",
    "username",
    "name",
    "contactEmail",
    "mdaId",
    "mdaName",
    "isActive",
    "lastLogin",
    "createdAt",
];

const MDA_HEADER: [&str; 7] = [
    "id",
    "name",
    "isActive",
    "reportCount",
    "activeReportCount",
    "reports",
    "createdAt",
];

fn user_fields(user: &User, mda: Option<&MdaSummary>) -> [String; 9] {
    [
        user.id.clone(),
        user.username.clone(),
        user.name.clone(),
        user.contact_email.clone(),
        user.mda_id.clone(),
        mda.map(|m| m.name.clone()).unwrap_or_default(),
        bool_str(user.is_active).to_string(),
        time_opt(&user.last_login),
        time(&user.created_at),
    ]
}

fn mda_fields(mda: &Mda) -> [String; 7] {
    let titles: Vec<&str> = mda.reports.iter().map(|r| r.title.as_str()).collect();
    [
        mda.id.clone(),
        mda.name.clone(),
        bool_str(mda.is_active).to_string(),
        mda.reports.len().to_string(),
        mda.reports.iter().filter(|r| r.is_active).count().to_string(),
        titles.join("; "),
        time(&mda.created_at),
    ]
}

pub fn users_csv(users: &[UserView]) -> Result<String, ApiError> {
    let mut wtr = csv_writer();
    write_row(&mut wtr, USER_HEADER)?;
    for view in users {
        write_row(&mut wtr, user_fields(&view.user, view.mda.as_ref()))?;
    }
    finish(wtr)
}

pub fn mdas_csv(mdas: &[Mda]) -> Result<String, ApiError> {
    let mut wtr = csv_writer();
    write_row(&mut wtr, MDA_HEADER)?;
    for mda in mdas {
        write_row(&mut wtr, mda_fields(mda))?;
    }
    finish(wtr)
}

/// One row per (MDA, user); an MDA without users still gets one row
pub fn combined_csv(groups: &[MdaWithUsers]) -> Result<String, ApiError> {
    let mut wtr = csv_writer();
    let header = ["mdaId", "mdaName", "mdaIsActive", "reportCount"]
        .into_iter()
        .chain(["userId", "username", "name", "contactEmail", "userIsActive", "lastLogin"]);
    write_row(&mut wtr, header)?;

    for group in groups {
        let mda = &group.mda;
        let mda_cols = [
            mda.id.clone(),
            mda.name.clone(),
            bool_str(mda.is_active).to_string(),
            mda.reports.len().to_string(),
        ];
        if group.users.is_empty() {
            write_row(
                &mut wtr,
                mda_cols.iter().cloned().chain(std::iter::repeat_n(String::new(), 6)),
            )?;
            continue;
        }
        for user in &group.users {
            let user_cols = [
                user.id.clone(),
                user.username.clone(),
                user.name.clone(),
                user.contact_email.clone(),
                bool_str(user.is_active).to_string(),
                time_opt(&user.last_login),
            ];
            write_row(&mut wtr, mda_cols.iter().cloned().chain(user_cols))?;
        }
    }
    finish(wtr)
}

/// CSV attachment named `<kind>-export-<date>.csv`
pub fn csv_response(kind: &str, body: String) -> Response {
    let filename = format!("{}-export-{}.csv", kind, Utc::now().format("%Y%m%d"));
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

pub fn json_response<T: Serialize>(rows: Vec<T>) -> Response {
    Json(rows).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Report;

    fn mda(name: &str) -> Mda {
        Mda::new(
            name,
            vec![
                Report {
                    title: "Budget, 2024".into(),
                    url: "https://a.gov/b".into(),
                    is_active: true,
                },
                Report {
                    title: "Audit".into(),
                    url: "https://a.gov/a".into(),
                    is_active: false,
                },
            ],
        )
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse(None).unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::parse(Some("CSV")).unwrap(), ExportFormat::Csv);
        assert!(ExportFormat::parse(Some("xlsx")).is_err());
    }

    #[test]
    fn test_fields_are_quoted_when_needed() {
        let mut works = mda("Works");
        works.name = "Say \"hi\", then\nleave".into();
        let csv = mdas_csv(&[works]).unwrap();
        assert!(csv.contains(",\"Say \"\"hi\"\", then\nleave\",true,"));
    }

    #[test]
    fn test_mdas_csv() {
        let csv = mdas_csv(&[mda("Works")]).unwrap();
        let mut lines = csv.split("\r\n");
        assert_eq!(
            lines.next(),
            Some("id,name,isActive,reportCount,activeReportCount,reports,createdAt")
        );
        let row = lines.next().unwrap();
        assert!(row.contains(",Works,true,2,1,\"Budget, 2024; Audit\","));
    }

    #[test]
    fn test_combined_csv_keeps_empty_mdas() {
        let works = mda("Works");
        let user = User::new("jdoe", "John", "j@mda.gov", "h", &works.id);
        let groups = vec![
            MdaWithUsers {
                mda: works,
                users: vec![user],
            },
            MdaWithUsers {
                mda: mda("Health"),
                users: vec![],
            },
        ];
        let csv = combined_csv(&groups).unwrap();
        let lines: Vec<&str> = csv.trim_end().split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("jdoe"));
        assert!(lines[2].ends_with(",,,,,,"));
        assert_eq!(lines[0].split(',').count(), 10);
    }

    #[test]
    fn test_csv_response_headers() {
        let response = csv_response("users", "a,b\r\n".to_string());
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            CSV_CONTENT_TYPE
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment; filename=\"users-export-"));
    }
}
