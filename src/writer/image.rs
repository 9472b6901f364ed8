//! Image and foreign-page XObjects.
//!
//! Per ISO 32000-1 Section 8.9 images are XObjects. Bitmaps are compressed
//! with Flate and deduplicated by size, depth and content checksum; JPEG
//! data is passed through with `DCTDecode`. Pages of other PDF documents
//! become form XObjects, either with their objects copied in or as
//! reference XObjects pointing at the embedded source file.

use super::{stream_object, IndirectObject};
use crate::config::ForeignPdfPolicy;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::{Dict, Object, ObjectRef};
use crate::writer::allocator::ObjectAllocator;
use md5::{Digest, Md5};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Color space for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB color (3 components per pixel)
    DeviceRGB,
    /// CMYK color (4 components per pixel)
    DeviceCMYK,
}

impl ColorSpace {
    /// Get the number of color components.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRGB => 3,
            ColorSpace::DeviceCMYK => 4,
        }
    }

    /// Get the PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// Uncompressed pixel data from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per component, 1 or 8
    pub bits_per_component: u8,
    /// Color space of `pixels`
    pub color_space: ColorSpace,
    /// Rows top to bottom, each padded to a whole byte
    pub pixels: Vec<u8>,
    /// Optional 8-bit alpha channel, one byte per pixel
    pub alpha: Option<Vec<u8>>,
}

/// Deduplication key of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapKey {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: ColorSpace,
    checksum: [u8; 16],
    alpha_checksum: Option<[u8; 16]>,
}

impl Bitmap {
    /// 8-bit RGB bitmap.
    pub fn rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::new(width, height, 8, ColorSpace::DeviceRGB, pixels)
    }

    /// 8-bit grayscale bitmap.
    pub fn gray(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::new(width, height, 8, ColorSpace::DeviceGray, pixels)
    }

    /// Bitmap with explicit depth and color space.
    pub fn new(width: u32, height: u32, bits_per_component: u8, color_space: ColorSpace, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Image("bitmap has no pixels".into()));
        }
        if !matches!(bits_per_component, 1 | 8) {
            return Err(Error::Image(format!("unsupported depth {}", bits_per_component)));
        }
        let bits_per_row = u64::from(width) * u64::from(color_space.components()) * u64::from(bits_per_component);
        let expected = bits_per_row.div_ceil(8) * u64::from(height);
        if pixels.len() as u64 != expected {
            return Err(Error::Image(format!("expected {} bytes of pixel data, got {}", expected, pixels.len())));
        }
        Ok(Self {
            width,
            height,
            bits_per_component,
            color_space,
            pixels,
            alpha: None,
        })
    }

    /// Attach an 8-bit alpha channel.
    pub fn with_alpha(mut self, alpha: Vec<u8>) -> Result<Self> {
        if alpha.len() as u64 != u64::from(self.width) * u64::from(self.height) {
            return Err(Error::Image("alpha channel size does not match bitmap".into()));
        }
        self.alpha = Some(alpha);
        Ok(self)
    }

    /// Decode a PNG image.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        use image::GenericImageView;

        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| Error::Image(format!("failed to decode PNG: {}", e)))?;
        let (width, height) = img.dimensions();

        match img.color() {
            image::ColorType::L8 | image::ColorType::L16 => Self::gray(width, height, img.to_luma8().into_raw()),
            image::ColorType::La8 | image::ColorType::La16 => {
                let la = img.to_luma_alpha8();
                let mut gray = Vec::with_capacity((width * height) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in la.pixels() {
                    gray.push(pixel.0[0]);
                    alpha.push(pixel.0[1]);
                }
                Self::gray(width, height, gray)?.with_alpha(alpha)
            },
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }
                Self::rgb(width, height, rgb)?.with_alpha(alpha)
            },
            _ => Self::rgb(width, height, img.to_rgb8().into_raw()),
        }
    }

    /// Content-addressable key: size, depth, pixel and alpha checksums.
    pub fn key(&self) -> BitmapKey {
        BitmapKey {
            width: self.width,
            height: self.height,
            bits_per_component: self.bits_per_component,
            color_space: self.color_space,
            checksum: md5(&self.pixels),
            alpha_checksum: self.alpha.as_deref().map(md5),
        }
    }
}

/// JPEG data embedded without transcoding.
#[derive(Debug, Clone, PartialEq)]
pub struct JpegImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color space from the frame header
    pub color_space: ColorSpace,
    /// The JPEG file
    pub data: Vec<u8>,
    /// Optional 8-bit alpha channel
    pub alpha: Option<Vec<u8>>,
}

impl JpegImage {
    /// Read dimensions and components from the JPEG frame header.
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let (width, height, color_space) = parse_jpeg_header(&data)?;
        Ok(Self {
            width,
            height,
            color_space,
            data,
            alpha: None,
        })
    }

    /// Attach an 8-bit alpha channel.
    pub fn with_alpha(mut self, alpha: Vec<u8>) -> Result<Self> {
        if alpha.len() as u64 != u64::from(self.width) * u64::from(self.height) {
            return Err(Error::Image("alpha channel size does not match JPEG".into()));
        }
        self.alpha = Some(alpha);
        Ok(self)
    }
}

/// Parse JPEG header to extract dimensions and color space.
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::Image("not a valid JPEG".into()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        pos += 2;

        // fill bytes and stuffed zeros
        if marker == 0xFF || marker == 0x00 {
            continue;
        }

        // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            if pos + 8 > data.len() {
                return Err(Error::Image("truncated JPEG header".into()));
            }
            let height = u32::from(u16::from_be_bytes([data[pos + 3], data[pos + 4]]));
            let width = u32::from(u16::from_be_bytes([data[pos + 5], data[pos + 6]]));
            let color_space = match data[pos + 7] {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceRGB,
            };
            if width == 0 || height == 0 {
                return Err(Error::Image("JPEG frame has no pixels".into()));
            }
            return Ok((width, height, color_space));
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
        pos += length;
    }

    Err(Error::Image("could not find JPEG dimensions".into()))
}

fn md5(data: &[u8]) -> [u8; 16] {
    Md5::digest(data).into()
}

/// A page of another PDF, as delivered by a PDF reader.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignPage {
    /// Page media box in the foreign document's user space
    pub media_box: Rect,
    /// Decoded page content
    pub content: Vec<u8>,
    /// Page `/Resources`, possibly referring into `objects`
    pub resources: Object,
    /// Foreign objects by their object number
    pub objects: BTreeMap<u32, Object>,
    /// Complete source file, needed for reference XObjects
    pub source_pdf: Option<Vec<u8>>,
    /// File name used for the embedded source
    pub source_name: String,
    /// Zero-based page number in the source
    pub page_index: u32,
    /// Rendering shown by readers that ignore reference XObjects
    pub fallback: Option<Bitmap>,
}

impl ForeignPage {
    /// Pixel size of a fallback rendering of the media box at `dpi`.
    pub fn fallback_pixels(&self, dpi: u32) -> (u32, u32) {
        let scale = f64::from(dpi) / 72.0;
        (
            (self.media_box.width * scale).ceil().max(1.0) as u32,
            (self.media_box.height * scale).ceil().max(1.0) as u32,
        )
    }
}

/// What an image resource is made from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw pixels
    Bitmap(Bitmap),
    /// JPEG passthrough
    Jpeg(JpegImage),
    /// Foreign PDF page
    ForeignPage(Box<ForeignPage>, ForeignPdfPolicy),
}

/// An XObject waiting for emission.
#[derive(Debug, Clone)]
pub struct PendingXObject {
    /// Object id referenced by content streams
    pub id: u32,
    /// Source data
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ImageKey {
    Bitmap(BitmapKey),
    Jpeg([u8; 16], Option<[u8; 16]>),
}

/// Registry of image XObjects, deduplicated by content.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    by_key: HashMap<ImageKey, u32>,
    pending: Vec<PendingXObject>,
}

impl ImageRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Object id for a bitmap; identical bitmaps share one object.
    pub fn register_bitmap(&mut self, allocator: &mut ObjectAllocator, bitmap: &Bitmap) -> u32 {
        let key = ImageKey::Bitmap(bitmap.key());
        self.register(allocator, key, || ImageSource::Bitmap(bitmap.clone()))
    }

    /// Object id for JPEG data; identical data shares one object.
    pub fn register_jpeg(&mut self, allocator: &mut ObjectAllocator, jpeg: &JpegImage) -> u32 {
        let key = ImageKey::Jpeg(md5(&jpeg.data), jpeg.alpha.as_deref().map(md5));
        self.register(allocator, key, || ImageSource::Jpeg(jpeg.clone()))
    }

    /// Object id for a foreign page form XObject; never shared.
    pub fn register_foreign_page(
        &mut self,
        allocator: &mut ObjectAllocator,
        page: ForeignPage,
        policy: ForeignPdfPolicy,
    ) -> u32 {
        let id = allocator.create_object();
        self.pending.push(PendingXObject {
            id,
            source: ImageSource::ForeignPage(Box::new(page), policy),
        });
        id
    }

    fn register(&mut self, allocator: &mut ObjectAllocator, key: ImageKey, source: impl FnOnce() -> ImageSource) -> u32 {
        if let Some(&id) = self.by_key.get(&key) {
            log::trace!("image reused as object {}", id);
            return id;
        }
        let id = allocator.create_object();
        self.by_key.insert(key, id);
        self.pending.push(PendingXObject { id, source: source() });
        id
    }

    /// Number of distinct XObjects registered.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hand out everything registered so far.
    pub fn take_pending(&mut self) -> Vec<PendingXObject> {
        std::mem::take(&mut self.pending)
    }
}

fn image_dict(width: u32, height: u32, color_space: ColorSpace, bits: u8) -> Dict {
    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("XObject".into()));
    dict.insert("Subtype".into(), Object::Name("Image".into()));
    dict.insert("Width".into(), Object::Integer(i64::from(width)));
    dict.insert("Height".into(), Object::Integer(i64::from(height)));
    dict.insert("ColorSpace".into(), Object::Name(color_space.pdf_name().into()));
    dict.insert("BitsPerComponent".into(), Object::Integer(i64::from(bits)));
    dict
}

fn soft_mask(width: u32, height: u32, alpha: &[u8], compress: bool) -> Result<Object> {
    stream_object(image_dict(width, height, ColorSpace::DeviceGray, 8), alpha.to_vec(), compress)
}

/// Objects of a bitmap XObject and its soft mask.
pub fn bitmap_objects(id: u32, bitmap: &Bitmap, allocator: &mut ObjectAllocator, compress: bool) -> Result<Vec<IndirectObject>> {
    let mut objects = Vec::with_capacity(2);
    let mut dict = image_dict(bitmap.width, bitmap.height, bitmap.color_space, bitmap.bits_per_component);
    if let Some(alpha) = &bitmap.alpha {
        let mask_id = allocator.create_object();
        dict.insert("SMask".into(), Object::Reference(mask_id.into()));
        objects.push((mask_id, soft_mask(bitmap.width, bitmap.height, alpha, compress)?));
    }
    objects.insert(0, (id, stream_object(dict, bitmap.pixels.clone(), compress)?));
    Ok(objects)
}

/// Objects of a JPEG XObject and its soft mask.
pub fn jpeg_objects(id: u32, jpeg: &JpegImage, allocator: &mut ObjectAllocator, compress: bool) -> Result<Vec<IndirectObject>> {
    let mut objects = Vec::with_capacity(2);
    let mut dict = image_dict(jpeg.width, jpeg.height, jpeg.color_space, 8);
    dict.insert("Filter".into(), Object::Name("DCTDecode".into()));
    if jpeg.color_space == ColorSpace::DeviceCMYK {
        // Adobe-style inverted CMYK
        dict.insert(
            "Decode".into(),
            Object::Array([1, 0, 1, 0, 1, 0, 1, 0].iter().map(|&v| Object::Integer(v)).collect()),
        );
    }
    if let Some(alpha) = &jpeg.alpha {
        let mask_id = allocator.create_object();
        dict.insert("SMask".into(), Object::Reference(mask_id.into()));
        objects.push((mask_id, soft_mask(jpeg.width, jpeg.height, alpha, compress)?));
    }
    objects.insert(
        0,
        (
            id,
            Object::Stream {
                dict,
                data: bytes::Bytes::from(jpeg.data.clone()),
            },
        ),
    );
    Ok(objects)
}

fn form_dict(bbox: &Rect, resources: Object) -> Dict {
    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("XObject".into()));
    dict.insert("Subtype".into(), Object::Name("Form".into()));
    dict.insert(
        "BBox".into(),
        Object::Array(vec![
            Object::Real(bbox.x),
            Object::Real(bbox.y),
            Object::Real(bbox.x + bbox.width),
            Object::Real(bbox.y + bbox.height),
        ]),
    );
    dict.insert("Resources".into(), resources);
    dict
}

/// Copy the foreign objects reachable from `root` under fresh ids.
///
/// References to objects missing from the foreign graph become `null`.
fn copy_foreign_graph(
    page: &ForeignPage,
    root: &Object,
    allocator: &mut ObjectAllocator,
    out: &mut Vec<IndirectObject>,
) -> Object {
    let mut mapping: HashMap<u32, u32> = HashMap::new();
    let mut queue: VecDeque<u32> = VecDeque::new();

    let mut enqueue = |obj: &Object, mapping: &mut HashMap<u32, u32>, queue: &mut VecDeque<u32>| {
        for r in obj.references() {
            if page.objects.contains_key(&r.id) && !mapping.contains_key(&r.id) {
                mapping.insert(r.id, allocator.create_object());
                queue.push_back(r.id);
            }
        }
    };

    enqueue(root, &mut mapping, &mut queue);
    let mut copied = Vec::new();
    while let Some(foreign_id) = queue.pop_front() {
        if let Some(obj) = page.objects.get(&foreign_id) {
            enqueue(obj, &mut mapping, &mut queue);
            copied.push((foreign_id, obj.clone()));
        }
    }

    let remap = |r: ObjectRef| mapping.get(&r.id).map(|&id| ObjectRef::new(id, 0));
    for (foreign_id, mut obj) in copied {
        obj.remap_references(&remap);
        if let Some(&new_id) = mapping.get(&foreign_id) {
            out.push((new_id, obj));
        }
    }
    let mut root = root.clone();
    root.remap_references(&remap);
    root
}

/// Objects of a foreign page XObject.
///
/// `file_spec` receives the embedded source file for reference XObjects and
/// returns the id of its file specification.
pub fn foreign_page_objects(
    id: u32,
    page: &ForeignPage,
    policy: ForeignPdfPolicy,
    allocator: &mut ObjectAllocator,
    images: &mut ImageRegistry,
    compress: bool,
    file_spec: &mut dyn FnMut(&mut ObjectAllocator, &str, &[u8]) -> u32,
) -> Result<Vec<IndirectObject>> {
    let mut objects = Vec::new();
    match policy {
        ForeignPdfPolicy::Embed => {
            let resources = copy_foreign_graph(page, &page.resources, allocator, &mut objects);
            let dict = form_dict(&page.media_box, resources);
            objects.insert(0, (id, stream_object(dict, page.content.clone(), compress)?));
        },
        ForeignPdfPolicy::Reference => {
            let source = page
                .source_pdf
                .as_deref()
                .ok_or_else(|| Error::InvalidArgument("reference XObject needs the source PDF".into()))?;
            let spec_id = file_spec(allocator, &page.source_name, source);

            let mut resources = Dict::new();
            let mut content = Vec::new();
            if let Some(fallback) = &page.fallback {
                let image_id = images.register_bitmap(allocator, fallback);
                let name = format!("Im{}", image_id);
                let mut xobjects = Dict::new();
                xobjects.insert(name.clone(), Object::Reference(image_id.into()));
                resources.insert("XObject".into(), Object::Dictionary(xobjects));
                let mut ops = super::content::ContentStreamBuilder::new();
                ops.save_state()
                    .transform(crate::geometry::Matrix {
                        a: page.media_box.width,
                        b: 0.0,
                        c: 0.0,
                        d: page.media_box.height,
                        e: page.media_box.x,
                        f: page.media_box.y,
                    })
                    .paint_xobject(&name)
                    .restore_state();
                content = ops.finish();
            }

            let mut dict = form_dict(&page.media_box, Object::Dictionary(resources));
            let mut reference = Dict::new();
            reference.insert("F".into(), Object::Reference(spec_id.into()));
            reference.insert("Page".into(), Object::Integer(i64::from(page.page_index)));
            dict.insert("Ref".into(), Object::Dictionary(reference));
            objects.insert(0, (id, stream_object(dict, content, compress)?));
        },
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_jpeg(width: u16, height: u16, components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.push(components);
        data.extend_from_slice(&[0x01, 0x11, 0x00, 0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_color_space_components() {
        assert_eq!(ColorSpace::DeviceGray.components(), 1);
        assert_eq!(ColorSpace::DeviceRGB.components(), 3);
        assert_eq!(ColorSpace::DeviceCMYK.pdf_name(), "DeviceCMYK");
    }

    #[test]
    fn test_bitmap_size_validation() {
        assert!(Bitmap::rgb(2, 2, vec![0; 12]).is_ok());
        assert!(Bitmap::rgb(2, 2, vec![0; 11]).is_err());
        assert!(Bitmap::new(9, 1, 1, ColorSpace::DeviceGray, vec![0; 2]).is_ok());
        assert!(Bitmap::gray(0, 1, vec![]).is_err());
        assert!(Bitmap::gray(2, 1, vec![0, 0]).unwrap().with_alpha(vec![0]).is_err());
    }

    #[test]
    fn test_bitmap_dedup() {
        let mut alloc = ObjectAllocator::new();
        let mut registry = ImageRegistry::new();
        let a = Bitmap::rgb(1, 1, vec![255, 0, 0]).unwrap();
        let b = Bitmap::rgb(1, 1, vec![255, 0, 0]).unwrap();
        let c = b.clone().with_alpha(vec![128]).unwrap();
        let id_a = registry.register_bitmap(&mut alloc, &a);
        assert_eq!(registry.register_bitmap(&mut alloc, &b), id_a);
        assert_ne!(registry.register_bitmap(&mut alloc, &c), id_a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_bitmap_objects_with_alpha() {
        let mut alloc = ObjectAllocator::new();
        let id = alloc.create_object();
        let bitmap = Bitmap::gray(2, 1, vec![0, 255]).unwrap().with_alpha(vec![255, 0]).unwrap();
        let objects = bitmap_objects(id, &bitmap, &mut alloc, false).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].0, id);
        let Object::Stream { dict, data } = &objects[0].1 else {
            panic!("expected stream");
        };
        assert_eq!(dict["SMask"].as_reference().map(|r| r.id), Some(objects[1].0));
        assert_eq!(dict["ColorSpace"].as_name(), Some("DeviceGray"));
        assert_eq!(&data[..], &[0, 255]);
    }

    #[test]
    fn test_jpeg_header() {
        let jpeg = JpegImage::from_data(minimal_jpeg(640, 480, 3)).unwrap();
        assert_eq!((jpeg.width, jpeg.height), (640, 480));
        assert_eq!(jpeg.color_space, ColorSpace::DeviceRGB);
        let cmyk = JpegImage::from_data(minimal_jpeg(10, 20, 4)).unwrap();
        assert_eq!(cmyk.color_space, ColorSpace::DeviceCMYK);
        assert!(JpegImage::from_data(vec![0x89, b'P', b'N', b'G']).is_err());
    }

    #[test]
    fn test_jpeg_passthrough() {
        let mut alloc = ObjectAllocator::new();
        let id = alloc.create_object();
        let data = minimal_jpeg(8, 8, 1);
        let jpeg = JpegImage::from_data(data.clone()).unwrap();
        let objects = jpeg_objects(id, &jpeg, &mut alloc, true).unwrap();
        let Object::Stream { dict, data: payload } = &objects[0].1 else {
            panic!("expected stream");
        };
        assert_eq!(dict["Filter"].as_name(), Some("DCTDecode"));
        assert_eq!(&payload[..], &data[..]);
    }

    fn foreign_page() -> ForeignPage {
        let mut font = Dict::new();
        font.insert("Type".into(), Object::Name("Font".into()));
        font.insert("Self".into(), Object::Reference(ObjectRef::new(12, 0)));
        let mut fonts = Dict::new();
        fonts.insert("F1".into(), Object::Reference(ObjectRef::new(12, 0)));
        fonts.insert("F2".into(), Object::Reference(ObjectRef::new(99, 0)));
        let mut resources = Dict::new();
        resources.insert("Font".into(), Object::Dictionary(fonts));
        let mut objects = BTreeMap::new();
        objects.insert(12, Object::Dictionary(font));
        ForeignPage {
            media_box: Rect::new(0.0, 0.0, 200.0, 100.0),
            content: b"BT /F1 10 Tf (x) Tj ET".to_vec(),
            resources: Object::Dictionary(resources),
            objects,
            source_pdf: Some(b"%PDF-1.4 source".to_vec()),
            source_name: "source.pdf".into(),
            page_index: 0,
            fallback: None,
        }
    }

    #[test]
    fn test_foreign_page_embed_remaps_references() {
        let mut alloc = ObjectAllocator::new();
        let mut images = ImageRegistry::new();
        let id = alloc.create_object();
        let mut no_spec = |_: &mut ObjectAllocator, _: &str, _: &[u8]| -> u32 { unreachable!() };
        let objects = foreign_page_objects(
            id,
            &foreign_page(),
            ForeignPdfPolicy::Embed,
            &mut alloc,
            &mut images,
            false,
            &mut no_spec,
        )
        .unwrap();
        assert_eq!(objects.len(), 2);
        let copied_id = objects[1].0;
        let Object::Stream { dict, .. } = &objects[0].1 else {
            panic!("expected stream");
        };
        let fonts = dict["Resources"].as_dict().unwrap()["Font"].as_dict().unwrap();
        assert_eq!(fonts["F1"].as_reference().map(|r| r.id), Some(copied_id));
        assert!(fonts["F2"].is_null());
        let copied = objects[1].1.as_dict().unwrap();
        assert_eq!(copied["Self"].as_reference().map(|r| r.id), Some(copied_id));
    }

    #[test]
    fn test_foreign_page_reference() {
        let mut alloc = ObjectAllocator::new();
        let mut images = ImageRegistry::new();
        let id = alloc.create_object();
        let mut spec = |alloc: &mut ObjectAllocator, name: &str, data: &[u8]| {
            assert_eq!(name, "source.pdf");
            assert!(data.starts_with(b"%PDF"));
            alloc.create_object()
        };
        let objects = foreign_page_objects(
            id,
            &foreign_page(),
            ForeignPdfPolicy::Reference,
            &mut alloc,
            &mut images,
            false,
            &mut spec,
        )
        .unwrap();
        let Object::Stream { dict, .. } = &objects[0].1 else {
            panic!("expected stream");
        };
        let reference = dict["Ref"].as_dict().unwrap();
        assert_eq!(reference["F"].as_reference().map(|r| r.id), Some(2));
        assert_eq!(reference["Page"].as_integer(), Some(0));
    }
}
