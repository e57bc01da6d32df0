use super::RosterRow;

const HEADER: [&str; 18] = [
    "username",
    "full_name",
    "email",
    "country_of_residence",
    "approval",
    "setup_completed",
    "first_incomplete",
    "university",
    "degree",
    "major",
    "graduation_year",
    "first_hackathon",
    "shirt_size",
    "need_visa",
    "need_reimbursement",
    "dietary_requirements",
    "has_cv",
    "rsvp_going",
];

/// Serializes roster rows to CSV. The header is written even for an empty
/// roster so exports always have the same shape.
pub fn export_csv(rows: &[RosterRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(std::io::Error::other(err.to_string())))
}
