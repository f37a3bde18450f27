use photo_sorter_application::{ItemOutcome, MoveEvent, ScanEvent};
use photo_sorter_domain::Image;

pub fn present_image_row(image: &Image) -> String {
    let persons = if image.persons.is_empty() {
        "-".to_string()
    } else {
        image.persons.iter().cloned().collect::<Vec<_>>().join(",")
    };
    format!(
        "{}\t{}\t{}\t{}",
        image.id.get(),
        image.status,
        persons,
        image.path.display()
    )
}

pub fn present_scan_event(event: &ScanEvent) -> Option<String> {
    if let Some(image) = &event.image {
        return Some(format!("[{}] found {}", event.scanned, image.filename));
    }
    match (&event.error, event.done) {
        (Some(reason), false) => Some(format!("[{}] skipped: {reason}", event.scanned)),
        _ => None,
    }
}

pub fn present_move_progress(event: &MoveEvent) -> Option<String> {
    let outcome = event.outcome.as_ref()?;
    let line = match outcome {
        ItemOutcome::Moved { destination, .. } => format!(
            "[{}/{}] {} -> {}",
            event.moved_count,
            event.total,
            event.current_file,
            destination.display()
        ),
        ItemOutcome::Failed { reason, .. } => format!(
            "[{}/{}] {} failed: {reason}",
            event.moved_count, event.total, event.current_file
        ),
    };
    Some(line)
}
