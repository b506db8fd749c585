//! Downloadable renditions of plans and reports
//!
//! Only CSV is rendered here; PDF and spreadsheet documents are produced by a
//! separate document service.

use std::collections::BTreeSet;
use std::str::FromStr;

use csv::Writer;

use crate::error::{AppError, AppResult};
use crate::models::{DailyPlan, DailyReport, MonthlyPlan, ProductionEntry, ProductionItem, WeeklyPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
    Excel,
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" => Ok(ExportFormat::Excel),
            other => Err(AppError::validation("format", format!("Unknown export format '{}'", other))),
        }
    }
}

/// A rendered file ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Export {
    fn csv(stem: &str, id: &str, body: Vec<u8>) -> Self {
        Self {
            filename: format!("{}-{}.csv", stem, id),
            content_type: "text/csv; charset=utf-8",
            body,
        }
    }
}

/// Fail unless the requested format is rendered locally
pub fn ensure_supported(format: ExportFormat) -> AppResult<()> {
    match format {
        ExportFormat::Csv => Ok(()),
        ExportFormat::Pdf | ExportFormat::Excel => Err(AppError::NotImplemented(
            "PDF and Excel downloads are provided by the document service".into(),
        )),
    }
}

pub fn monthly_csv(plan: &MonthlyPlan) -> AppResult<Export> {
    Ok(Export::csv("monthly-plan", &plan.id, items_csv(&plan.items)?))
}

pub fn weekly_csv(plan: &WeeklyPlan) -> AppResult<Export> {
    Ok(Export::csv("weekly-plan", &plan.id, items_csv(&plan.items)?))
}

pub fn daily_csv(plan: &DailyPlan) -> AppResult<Export> {
    Ok(Export::csv("daily-plan", &plan.id, entries_csv(&plan.entries, false)?))
}

pub fn report_csv(report: &DailyReport) -> AppResult<Export> {
    Ok(Export::csv("daily-report", &report.id, entries_csv(&report.entries, true)?))
}

/// One row per item; one column per quantity key found on any item
fn items_csv(items: &[ProductionItem]) -> AppResult<Vec<u8>> {
    let keys: BTreeSet<&String> = items
        .iter()
        .flat_map(|item| item.weekly_quantities.keys())
        .collect();

    let mut writer = Writer::from_writer(Vec::new());
    let mut header = vec!["itemCode", "itemName", "customerName", "monthlyQuantity"];
    header.extend(keys.iter().map(|k| k.as_str()));
    writer.write_record(&header).map_err(csv_error)?;

    for item in items {
        let mut row = vec![
            item.item_code.clone(),
            item.item_name.clone(),
            item.customer_name.clone(),
            item.monthly_quantity.to_string(),
        ];
        row.extend(keys.iter().map(|k| {
            item.weekly_quantities
                .get(*k)
                .map(u32::to_string)
                .unwrap_or_default()
        }));
        writer.write_record(&row).map_err(csv_error)?;
    }

    finish(writer)
}

fn entries_csv(entries: &[ProductionEntry], with_actuals: bool) -> AppResult<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    let mut header = vec![
        "deptName", "operatorName", "work", "itemCode", "h1Plan", "h2Plan", "otPlan", "target",
    ];
    if with_actuals {
        header.extend([
            "h1Actual",
            "h2Actual",
            "otActual",
            "actualProduction",
            "qualityDefect",
            "productionPercentage",
            "reason",
            "correctiveActions",
            "responsiblePerson",
            "targetCompletionDate",
        ]);
    }
    writer.write_record(&header).map_err(csv_error)?;

    for entry in entries {
        let mut row = vec![
            entry.dept_name.clone(),
            entry.operator_name.clone(),
            entry.work.clone(),
            entry.item_code.clone().unwrap_or_default(),
            entry.h1_plan.to_string(),
            entry.h2_plan.to_string(),
            entry.ot_plan.to_string(),
            entry.target.to_string(),
        ];
        if with_actuals {
            row.extend([
                number(entry.h1_actual),
                number(entry.h2_actual),
                number(entry.ot_actual),
                number(entry.actual_production),
                number(entry.quality_defect),
                entry
                    .production_percentage
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_default(),
                entry.reason.clone().unwrap_or_default(),
                entry.corrective_actions.clone().unwrap_or_default(),
                entry.responsible_person.clone().unwrap_or_default(),
                entry.target_completion_date.clone().unwrap_or_default(),
            ]);
        }
        writer.write_record(&row).map_err(csv_error)?;
    }

    finish(writer)
}

fn number(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(writer: Writer<Vec<u8>>) -> AppResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::Internal(format!("CSV export failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_items_csv_has_one_column_per_quantity_key() {
        let item = ProductionItem {
            id: "i1".into(),
            item_code: "TEST001".into(),
            item_name: "Widget, large".into(),
            customer_name: "Acme".into(),
            monthly_quantity: 1000,
            weekly_quantities: BTreeMap::from([("day1".to_string(), 36), ("week1-7".to_string(), 250)]),
        };
        let csv = String::from_utf8(items_csv(&[item]).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "itemCode,itemName,customerName,monthlyQuantity,day1,week1-7");
        assert_eq!(lines[1], "TEST001,\"Widget, large\",Acme,1000,36,250");
    }

    #[test]
    fn test_report_csv_includes_actuals() {
        let entry = ProductionEntry {
            dept_name: "Assembly".into(),
            operator_name: "Ravi".into(),
            target: 100,
            actual_production: Some(70),
            production_percentage: Some(70.0),
            ..Default::default()
        };
        let csv = String::from_utf8(entries_csv(&[entry], true).unwrap()).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("Assembly,Ravi,,,0,0,0,100,,,,70,,70.00"));
    }

    #[test]
    fn test_pdf_is_not_rendered_locally() {
        assert!(ensure_supported(ExportFormat::Csv).is_ok());
        assert!(matches!(
            ensure_supported("pdf".parse().unwrap()),
            Err(AppError::NotImplemented(_))
        ));
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
