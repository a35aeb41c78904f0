use weave_core::Document;

pub const DOCS_COLLECTION: &str = "WeaveDocs";
pub const IMAGES_COLLECTION: &str = "WeaveImages";

fn chunk(id: &str, content: &str, filename: &str, index: u32, total: u32) -> Document {
    Document::new(id, content).with_meta(
        "metadata",
        format!(r#"{{"original_filename": "{filename}", "is_chunked": true, "chunk_index": {index}, "total_chunks": {total}}}"#),
    )
}

fn image(id: &str, content: &str, blob: &str) -> Document {
    Document::new(id, content).with_meta("metadata", blob)
}

pub fn docs() -> Vec<Document> {
    vec![
        chunk(
            "doc1-chunk1",
            "This is the first chunk of a document about machine learning. It covers the basics of supervised learning algorithms.",
            "ml_guide.pdf",
            0,
            3,
        ),
        chunk(
            "doc1-chunk2",
            "This is the second chunk discussing neural networks and deep learning architectures including CNNs and RNNs.",
            "ml_guide.pdf",
            1,
            3,
        ),
        chunk(
            "doc1-chunk3",
            "This is the final chunk covering practical applications, examples, and best practices for machine learning projects.",
            "ml_guide.pdf",
            2,
            3,
        ),
        Document::new(
            "doc2-single",
            "This is a single document without chunks. It contains information about data preprocessing \
             techniques and feature engineering.\n\nData preprocessing is a crucial step in the machine learning \
             pipeline. It involves cleaning, transforming, and organizing raw data into a format that is suitable \
             for analysis and modeling.",
        )
        .with_meta("author", "Test Author")
        .with_meta("topic", "Data Preprocessing")
        .with_meta("year", "2024"),
        chunk(
            "doc3-chunk1",
            "First chunk of another document about data science methodologies and statistical analysis techniques.",
            "data_science.pdf",
            0,
            2,
        ),
        chunk(
            "doc3-chunk2",
            "Second chunk covering data analysis techniques, visualization methods, and reporting best practices.",
            "data_science.pdf",
            1,
            2,
        ),
    ]
}

pub fn images() -> Vec<Document> {
    vec![
        image(
            "img1-page1",
            "Image extracted from page 1 of document.pdf",
            r#"{"original_filename": "document.pdf", "page_number": 1, "image_type": "chart"}"#,
        ),
        image(
            "img1-page2",
            "Image extracted from page 2 of document.pdf",
            r#"{"original_filename": "document.pdf", "page_number": 2, "image_type": "diagram"}"#,
        ),
        image(
            "img2-single",
            "Standalone image from presentation.pptx",
            r#"{"original_filename": "presentation.pptx", "slide_number": 5, "image_type": "screenshot"}"#,
        ),
    ]
}
