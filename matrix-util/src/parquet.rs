use ndarray::Array2;
use parquet::basic::Type as ParquetType;
use parquet::basic::{Compression, ConvertedType, Repetition, ZstdLevel};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;
use std::fs::File;
use std::sync::Arc;

/// One named column of a parquet table
pub enum ParquetColumn<'a> {
    Text(&'a [Box<str>]),
    Real(&'a [f64]),
}

impl ParquetColumn<'_> {
    fn len(&self) -> usize {
        match self {
            ParquetColumn::Text(x) => x.len(),
            ParquetColumn::Real(x) => x.len(),
        }
    }

    fn field(&self, name: &str) -> anyhow::Result<Arc<Type>> {
        let field = match self {
            ParquetColumn::Text(_) => Type::primitive_type_builder(name, ParquetType::BYTE_ARRAY)
                .with_repetition(Repetition::REQUIRED)
                .with_converted_type(ConvertedType::UTF8)
                .build()?,
            ParquetColumn::Real(_) => Type::primitive_type_builder(name, ParquetType::DOUBLE)
                .with_repetition(Repetition::REQUIRED)
                .build()?,
        };
        Ok(Arc::new(field))
    }
}

/// Write columns of equal length into `file_path` (zstd compressed)
///
/// * `columns`: pairs of column name and data
///
pub fn write_parquet_columns(
    file_path: &str,
    columns: &[(&str, ParquetColumn)],
) -> anyhow::Result<()> {
    let nrows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);

    if let Some((name, _)) = columns.iter().find(|(_, c)| c.len() != nrows) {
        return Err(anyhow::anyhow!(
            "column {} does not have {} rows",
            name,
            nrows
        ));
    }

    let fields = columns
        .iter()
        .map(|(name, c)| c.field(name))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let schema = Arc::new(Type::group_type_builder("table").with_fields(fields).build()?);

    let zstd_level = ZstdLevel::try_new(5)?;
    let writer_properties = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::ZSTD(zstd_level))
            .build(),
    );

    let file = File::create(file_path)?;
    let mut writer = SerializedFileWriter::new(file, schema, writer_properties)?;
    let mut row_group_writer = writer.next_row_group()?;

    for (_, data) in columns {
        if let Some(mut column_writer) = row_group_writer.next_column()? {
            match data {
                ParquetColumn::Text(words) => {
                    let words: Vec<ByteArray> =
                        words.iter().map(|w| ByteArray::from(w.as_ref())).collect();
                    column_writer
                        .typed::<ByteArrayType>()
                        .write_batch(&words, None, None)?;
                }
                ParquetColumn::Real(values) => {
                    column_writer
                        .typed::<DoubleType>()
                        .write_batch(values, None, None)?;
                }
            }
            column_writer.close()?;
        }
    }

    row_group_writer.close()?;
    writer.close()?;
    Ok(())
}

/// Write a matrix with a leading column of row names
///
/// * `row_column_name`: header of the row-name column
///
pub fn write_labeled_matrix_parquet(
    file_path: &str,
    mat: &Array2<f64>,
    row_names: &[Box<str>],
    column_names: &[Box<str>],
    row_column_name: &str,
) -> anyhow::Result<()> {
    if row_names.len() != mat.nrows() || column_names.len() != mat.ncols() {
        return Err(anyhow::anyhow!(
            "{} x {} names for a {:?} matrix",
            row_names.len(),
            column_names.len(),
            mat.dim()
        ));
    }

    let column_data: Vec<Vec<f64>> = mat.columns().into_iter().map(|c| c.to_vec()).collect();

    let mut columns = vec![(row_column_name, ParquetColumn::Text(row_names))];
    for (name, data) in column_names.iter().zip(column_data.iter()) {
        columns.push((name.as_ref(), ParquetColumn::Real(data)));
    }

    write_parquet_columns(file_path, &columns)
}

/// get field names and the number of rows by peeking into `file_path`
pub fn peek_parquet(file_path: &str) -> anyhow::Result<(Vec<Box<str>>, usize)> {
    let reader = SerializedFileReader::new(File::open(file_path)?)?;
    let metadata = reader.metadata().file_metadata();
    let names = metadata
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string().into_boxed_str())
        .collect();
    Ok((names, metadata.num_rows() as usize))
}
