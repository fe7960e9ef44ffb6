use std::path::Path;

use crate::client::ApiRequest;
use crate::models::document::{ParameterDocument, ISAPI_NAMESPACE, VENDOR_NAMESPACE};
use crate::models::image::{ExposureMode, IrcutFilterType};
use crate::models::status::{ResponseStatus, StatusConvention};
use crate::xml::XmlDocument;
use crate::{IsapiClient, IsapiError, IsapiResult};

const IMAGE_CHANNELS: &str = "/ISAPI/Image/channels";

fn channel_endpoint(channel: u32, resource: &str) -> String {
    format!("{IMAGE_CHANNELS}/{channel}/{resource}")
}

/// Provides methods for reading and adjusting image settings.
///
/// Values are never checked on the client side. The device clamps numeric
/// levels above the maximum to the maximum and below the minimum to 0, and
/// rejects malformed values with a bad request response that is returned
/// verbatim as [`IsapiError::HttpStatus`](crate::IsapiError::HttpStatus).
#[derive(Debug, Clone)]
pub struct ImageHandler {
    client: IsapiClient,
}

impl ImageHandler {
    /// Creates a new image API instance.
    ///
    /// This method is intended for internal use by the ISAPI client.
    pub(crate) fn new(client: IsapiClient) -> Self {
        Self { client }
    }

    /// Reads the settings of every image channel.
    ///
    /// The document holds the current values only; permitted values appear
    /// as `opt` attributes on some elements (see
    /// [`ImageHandler::discover_options`]).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use isapi_client::IsapiClient;
    /// #
    /// # async fn example(client: &IsapiClient) -> Result<(), isapi_client::IsapiError> {
    /// let settings = client.image().channels().await?;
    /// settings.save_pretty("image_channels.xml").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn channels(&self) -> IsapiResult<XmlDocument> {
        self.client.fetch_xml(ApiRequest::get(IMAGE_CHANNELS)).await
    }

    /// Replaces the settings of every image channel with `xml`.
    ///
    /// The bulk endpoint reports success as status code 0.
    pub async fn update_channels(&self, xml: impl Into<String>) -> IsapiResult<ResponseStatus> {
        self.client
            .write(ApiRequest::put_xml(IMAGE_CHANNELS, xml), StatusConvention::Bulk)
            .await
    }

    /// Like [`ImageHandler::update_channels`], reading the document from a
    /// file.
    pub async fn update_channels_from_file(
        &self,
        path: impl AsRef<Path>,
    ) -> IsapiResult<ResponseStatus> {
        let xml = tokio::fs::read_to_string(path.as_ref()).await?;
        self.update_channels(xml).await
    }

    /// Reads the color settings (brightness, contrast, saturation).
    pub async fn color(&self, channel: u32) -> IsapiResult<XmlDocument> {
        self.client.fetch_xml(ApiRequest::get(channel_endpoint(channel, "color"))).await
    }

    /// Reads the exposure settings, optionally narrowed with
    /// `parameterType` (e.g. `exposureMode`).
    pub async fn exposure(
        &self,
        channel: u32,
        parameter_type: Option<&str>,
    ) -> IsapiResult<XmlDocument> {
        let mut request = ApiRequest::get(channel_endpoint(channel, "exposure"));
        if let Some(parameter_type) = parameter_type {
            request = request.query("parameterType", parameter_type);
        }
        self.client.fetch_xml(request).await
    }

    /// Reads the image capabilities of a channel.
    pub async fn capabilities(&self, channel: u32) -> IsapiResult<XmlDocument> {
        self.client
            .fetch_xml(ApiRequest::get(channel_endpoint(channel, "capabilities")))
            .await
    }

    /// Writes a partial document to one channel resource.
    ///
    /// This is the primitive behind every typed setter; it is public so that
    /// resources without a dedicated method can still be updated.
    pub async fn update(
        &self,
        channel: u32,
        resource: &str,
        document: &ParameterDocument,
    ) -> IsapiResult<ResponseStatus> {
        self.client
            .write(
                ApiRequest::put_xml(channel_endpoint(channel, resource), document.render()),
                StatusConvention::SingleAttribute,
            )
            .await
    }

    /// Adjusts brightness, contrast and saturation.
    ///
    /// Only the levels set on the builder are sent.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use isapi_client::IsapiClient;
    /// #
    /// # async fn example(client: &IsapiClient) -> Result<(), isapi_client::IsapiError> {
    /// client.image().set_color(1).brightness(35).contrast(35).send().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_color(&self, channel: u32) -> SetColorBuilder {
        SetColorBuilder::new(self.clone(), channel)
    }

    pub async fn set_sharpness(&self, channel: u32, level: u32) -> IsapiResult<ResponseStatus> {
        self.update(channel, "sharpness", &sharpness_document(level)).await
    }

    /// Adjusts color and sharpness with two sequential writes.
    ///
    /// The sharpness write is skipped if the color write fails.
    pub fn set_image_adjustment(&self, channel: u32) -> ImageAdjustmentBuilder {
        ImageAdjustmentBuilder::new(self.clone(), channel)
    }

    pub async fn set_gain(&self, channel: u32, level: u32) -> IsapiResult<ResponseStatus> {
        let mut doc = ParameterDocument::with_namespace("Gain", VENDOR_NAMESPACE);
        doc.set("GainLevel", level);
        self.update(channel, "gain", &doc).await
    }

    /// Sets the white balance style, or manual red/blue gains.
    ///
    /// Style names are case sensitive on the device (`daylightLamp`, not
    /// `daylightlamp`). Manual mode only works on models that support it.
    pub fn set_white_balance(&self, channel: u32) -> WhiteBalanceBuilder {
        WhiteBalanceBuilder::new(self.clone(), channel)
    }

    /// Sets the shutter speed, e.g. `"1/120"`.
    ///
    /// Only values from the device's option list are accepted (see
    /// [`ImageHandler::shutter_levels`]); anything else is answered with
    /// HTTP 400.
    pub async fn set_shutter(
        &self,
        channel: u32,
        level: impl Into<String>,
    ) -> IsapiResult<ResponseStatus> {
        let mut doc = ParameterDocument::with_namespace("Shutter", ISAPI_NAMESPACE);
        doc.set("ShutterLevel", level.into());
        self.update(channel, "shutter", &doc).await
    }

    pub async fn set_ircut_filter(
        &self,
        channel: u32,
        filter: IrcutFilterType,
    ) -> IsapiResult<ResponseStatus> {
        let mut doc = ParameterDocument::with_namespace("IrcutFilter", VENDOR_NAMESPACE);
        doc.set("IrcutFilterType", filter);
        self.update(channel, "ircutFilter", &doc).await
    }

    pub async fn set_lens_distortion_correction(
        &self,
        channel: u32,
        enabled: bool,
    ) -> IsapiResult<ResponseStatus> {
        let mut doc = ParameterDocument::new("LensDistortionCorrection");
        doc.set("enabled", enabled);
        self.update(channel, "lensDistortionCorrection", &doc).await
    }

    /// Enables or disables electronic image stabilization.
    pub async fn set_eis(&self, channel: u32, enabled: bool) -> IsapiResult<ResponseStatus> {
        let mut doc = ParameterDocument::new("EIS");
        doc.set("enabled", enabled);
        self.update(channel, "EIS", &doc).await
    }

    pub async fn set_exposure(
        &self,
        channel: u32,
        mode: ExposureMode,
    ) -> IsapiResult<ResponseStatus> {
        let status = self.update(channel, "exposure", &mode.to_document()).await?;
        match mode.iris_level() {
            Some(level) => log::info!("exposure set to {mode} with iris level {level}"),
            None => log::info!("exposure set to {mode}"),
        }
        Ok(status)
    }

    /// Returns the permitted shutter speeds.
    ///
    /// See [`ImageHandler::discover_options`] for the caching behaviour.
    pub async fn shutter_levels(&self, cache_path: impl AsRef<Path>) -> IsapiResult<Vec<String>> {
        self.discover_options(cache_path, "ShutterLevel", "opt").await
    }

    /// Returns the comma separated option list stored in `attribute` of the
    /// first `element` of the image settings document.
    ///
    /// If `cache_path` exists it is parsed and the device is not contacted.
    /// Otherwise the settings are fetched once, saved pretty-printed to
    /// `cache_path`, and parsed. A missing element or attribute yields an
    /// empty list.
    pub async fn discover_options(
        &self,
        cache_path: impl AsRef<Path>,
        element: &str,
        attribute: &str,
    ) -> IsapiResult<Vec<String>> {
        let path = cache_path.as_ref();
        if tokio::fs::try_exists(path).await? {
            log::debug!("reading cached image settings from {}", path.display());
            return XmlDocument::load(path).await?.options(element, attribute);
        }

        log::info!("{} not found, fetching image settings from device", path.display());
        let document = self.channels().await?;
        // Parse errors past this point belong to the device body.
        let pretty = document.pretty().map_err(malformed_settings)?;
        let options = document.options(element, attribute).map_err(malformed_settings)?;
        tokio::fs::write(path, pretty).await?;
        log::info!("saved image settings to {}", path.display());
        Ok(options)
    }
}

fn malformed_settings(e: IsapiError) -> IsapiError {
    match e {
        IsapiError::Xml(msg) => {
            IsapiError::MalformedResponse(format!("image settings are not well-formed XML: {msg}"))
        }
        other => other,
    }
}

fn sharpness_document(level: u32) -> ParameterDocument {
    let mut doc = ParameterDocument::with_namespace("Sharpness", ISAPI_NAMESPACE);
    doc.set("SharpnessLevel", level);
    doc
}

fn color_document() -> ParameterDocument {
    ParameterDocument::new("Color")
}

#[derive(Debug, Clone)]
pub struct SetColorBuilder {
    handler: ImageHandler,
    channel: u32,
    document: ParameterDocument,
}

impl SetColorBuilder {
    pub(crate) fn new(handler: ImageHandler, channel: u32) -> Self {
        Self {
            handler,
            channel,
            document: color_document(),
        }
    }

    pub fn brightness(mut self, level: u32) -> Self {
        self.document.set("brightnessLevel", level);
        self
    }

    pub fn contrast(mut self, level: u32) -> Self {
        self.document.set("contrastLevel", level);
        self
    }

    pub fn saturation(mut self, level: u32) -> Self {
        self.document.set("saturationLevel", level);
        self
    }

    /// Sends `tag` as an empty element instead of omitting it.
    pub fn empty_field(mut self, tag: impl Into<String>) -> Self {
        self.document.empty(tag);
        self
    }

    pub async fn send(self) -> IsapiResult<ResponseStatus> {
        self.handler.update(self.channel, "color", &self.document).await
    }
}

#[derive(Debug, Clone)]
pub struct ImageAdjustmentBuilder {
    handler: ImageHandler,
    channel: u32,
    color: ParameterDocument,
    sharpness: Option<u32>,
}

impl ImageAdjustmentBuilder {
    pub(crate) fn new(handler: ImageHandler, channel: u32) -> Self {
        Self {
            handler,
            channel,
            color: color_document(),
            sharpness: None,
        }
    }

    pub fn brightness(mut self, level: u32) -> Self {
        self.color.set("brightnessLevel", level);
        self
    }

    pub fn contrast(mut self, level: u32) -> Self {
        self.color.set("contrastLevel", level);
        self
    }

    pub fn saturation(mut self, level: u32) -> Self {
        self.color.set("saturationLevel", level);
        self
    }

    pub fn sharpness(mut self, level: u32) -> Self {
        self.sharpness = Some(level);
        self
    }

    /// Sends color field `tag` as an empty element instead of omitting it.
    pub fn empty_field(mut self, tag: impl Into<String>) -> Self {
        self.color.empty(tag);
        self
    }

    /// Issues the color write (if any color field was set) and then the
    /// sharpness write (if a level was set). Returns the statuses in the
    /// order the writes were made.
    pub async fn send(self) -> IsapiResult<Vec<ResponseStatus>> {
        let mut statuses = Vec::new();
        if !self.color.is_empty() {
            statuses.push(self.handler.update(self.channel, "color", &self.color).await?);
        }
        if let Some(level) = self.sharpness {
            statuses.push(self.handler.set_sharpness(self.channel, level).await?);
        }
        Ok(statuses)
    }
}

#[derive(Debug, Clone)]
pub struct WhiteBalanceBuilder {
    handler: ImageHandler,
    channel: u32,
    style: Option<String>,
    manual_gains: Option<(u32, u32)>,
    empty_fields: Vec<String>,
}

impl WhiteBalanceBuilder {
    pub(crate) fn new(handler: ImageHandler, channel: u32) -> Self {
        Self {
            handler,
            channel,
            style: None,
            manual_gains: None,
            empty_fields: Vec::new(),
        }
    }

    /// Sets the style, e.g. `auto1` or `daylightLamp`.
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Selects the `manual` style with explicit red and blue gains.
    pub fn manual(mut self, red: u32, blue: u32) -> Self {
        self.style = Some("manual".to_string());
        self.manual_gains = Some((red, blue));
        self
    }

    /// Sends `tag` as an empty element instead of omitting it.
    pub fn empty_field(mut self, tag: impl Into<String>) -> Self {
        self.empty_fields.push(tag.into());
        self
    }

    fn document(&self) -> ParameterDocument {
        let mut doc = ParameterDocument::with_namespace("WhiteBalance", VENDOR_NAMESPACE);
        if let Some(style) = &self.style {
            doc.set("WhiteBalanceStyle", style);
            // Gains are only meaningful in manual style.
            if let (Some((red, blue)), "manual") = (self.manual_gains, style.as_str()) {
                doc.set("WhiteBalanceRed", red).set("WhiteBalanceBlue", blue);
            }
        }
        for tag in &self.empty_fields {
            doc.empty(tag.as_str());
        }
        doc
    }

    pub async fn send(self) -> IsapiResult<ResponseStatus> {
        let doc = self.document();
        self.handler.update(self.channel, "whiteBalance", &doc).await
    }
}
