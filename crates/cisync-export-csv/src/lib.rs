use cisync_domain::FlatAttr;
use color_eyre::eyre::Result;
use std::io::Write;

pub fn write_csv<W: Write>(writer: W, rows: &[FlatAttr]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["kind", "name", "attr", "value"])?;
    for r in rows {
        wtr.write_record([&r.kind, &r.name, &r.attr, &r.value])?;
    }

    wtr.flush()?;
    Ok(())
}
