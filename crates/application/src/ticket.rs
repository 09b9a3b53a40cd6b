use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domain::HardwareError;
use domain::codec::printer::{Alignment, PrintOptions, TextSize};

use crate::printer::PrinterController;

/// Barcode height used on entry tickets, in dots.
const TICKET_BARCODE_HEIGHT: u8 = 80;

/// Fields printed on an entry ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketData {
    pub barcode: String,
    pub plate_number: String,
    pub vehicle_type: String,
    pub entry_time: DateTime<Utc>,
    #[serde(default)]
    pub operator_id: Option<String>,
}

/// Print a formatted entry ticket: centered header, the entry fields, the
/// ticket barcode, then feed and cut.
pub async fn print_entry_ticket(
    printer: &PrinterController,
    ticket: &TicketData,
) -> Result<(), HardwareError> {
    let header = PrintOptions {
        align: Some(Alignment::Center),
        size: Some(TextSize::Large),
        ..PrintOptions::default()
    };
    printer.print("PARKING TICKET\n\n", header).await?;

    let entry_time = ticket.entry_time.format("%Y-%m-%d %H:%M:%S");
    printer
        .print(&format!("Date: {entry_time}\n"), PrintOptions::default())
        .await?;
    printer
        .print(
            &format!("Plate: {}\n", ticket.plate_number),
            PrintOptions::default(),
        )
        .await?;
    printer
        .print(
            &format!("Type: {}\n", ticket.vehicle_type),
            PrintOptions::default(),
        )
        .await?;
    if let Some(operator) = &ticket.operator_id {
        printer
            .print(&format!("Operator: {operator}\n"), PrintOptions::default())
            .await?;
    }

    printer
        .print_barcode(&ticket.barcode, TICKET_BARCODE_HEIGHT)
        .await?;
    printer.feed(5).await?;
    printer.cut().await
}
